//! 程序运行函数.

use crate::algos::Setup;
use crate::result::AblationResult;
use std::fs;
use std::thread;
use utils::loader;

/// 实际运行.
pub fn run() -> AblationResult {
    let image_dir = loader::image_dir_from_env_or_home();
    assert!(image_dir.is_dir(), "Image directory {image_dir:?} not found");

    let target_path = loader::target_path_from_env_or_home();
    let target = loader::load_rgb(&target_path).expect("Loading target image error");

    let output_dir = loader::output_dir_from_env_or_home();
    fs::create_dir_all(&output_dir).expect("Creating output directory error");

    // 短路判断
    assert!(
        loader::ImageLoader::new(&image_dir).is_ok_and(|l| !l.is_empty()),
        "Loading dataset config error"
    );

    let setup = Setup {
        image_dir,
        target,
        output_dir,
    };
    let setup = &setup;

    println!("Running ablation studies on {} cores...", utils::cpus());
    thread::scope(|s| {
        use super::algos::*;

        let handles = [macenko, vahadane, ruifrok, reinhard].map(|t| s.spawn(move || t(setup)));

        AblationResult::from_iter(
            ["macenko", "vahadane", "ruifrok", "reinhard"].into_iter().zip(
                handles
                    .into_iter()
                    .map(|th| th.join().expect("Thread joining error")),
            ),
        )
    })
}
