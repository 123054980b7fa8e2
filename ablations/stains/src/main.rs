//! 染色标准化消融实验: 在同一批图像上比较各标准化方法的耗时与成功率.

mod algos;
mod result;
mod runner;

fn main() {
    simple_logger::init_with_level(log::Level::Info).expect("Logger initialization error");
    runner::run().analyze();
}
