//! 实验结果.

use crate::algos::Profile;
use std::io::{self, Write};

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.6}"),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Profile `{name}`:")?;
    writeln!(w, "{S4}Fit on target: {}", p.is_fitted())?;
    writeln!(w, "{S4}Failed images: {}", p.get_failed())?;
    writeln!(w, "{S4}Normalized images: {}", p.get_target())?;
    writeln!(w, "{S4}Fit time: {} us", p.get_fit_time_us())?;
    writeln!(w, "{S4}Effective total time: {} us", p.get_target_time_us())?;
    writeln!(
        w,
        "{S4}Effective average time: {} us",
        f64_to_display(p.get_avg_target_time_us())
    )?;
    writeln!(w, "{S4}Total machine time: {} us", p.get_real_time_us())?;
    writeln!(w, "{S4}Pixels in total: {}", p.get_pixels())?;
    writeln!(
        w,
        "{S4}Effective throughput: {} pixels per us",
        f64_to_display(p.get_throughput())
    )?;
    let t = p.get_most_time_consuming().map(|d| d.as_micros() as u64);
    let t = t.map_or_else(|| "/".to_string(), |t| t.to_string());
    write!(w, "{S4}Most time-consuming image costs {t} us")?;
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    data: Vec<(&'static str, Profile)>,
}

impl AblationResult {
    pub fn from_iter<I: IntoIterator<Item = (&'static str, Profile)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 分析运行结果.
    pub fn analyze(&self) {
        utils::sep();
        let mut buf = Vec::with_capacity(512);

        for (key, profile) in self.data.iter() {
            describe_into(key, profile, &mut buf).unwrap();
            println!("{}", String::from_utf8_lossy(&buf));
            buf.clear();

            utils::sep();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_empty_profile() {
        let mut buf = Vec::new();
        describe_into("empty", &Profile::new().finish(), &mut buf).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert!(s.starts_with("Profile `empty`:"));
        assert!(s.contains("Normalized images: 0"));
        assert!(s.contains("Effective average time: /"));
        assert!(s.ends_with("costs / us"));
    }
}
