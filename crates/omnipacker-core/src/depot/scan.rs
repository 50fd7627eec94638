use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use super::names::is_shared_depot;

struct Patterns {
    depot_name: Regex,
    depot_manifest: Regex,
    appinfo_name: Regex,
    depot: Regex,
    manifest: Regex,
    build_id: Regex,
    release_epoch: [Regex; 3],
    manifest_created: Regex,
    dotnet_time: Regex,
    iso_time: Regex,
    install_dir: Regex,
}

fn patterns() -> &'static Patterns {
    static P: OnceLock<Patterns> = OnceLock::new();
    P.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("static manifest pattern");
        Patterns {
            depot_name: re(r#"[Dd]epot\s+(\d+)\s+"([^"]+)""#),
            depot_manifest: re(r"[Dd]epot\s+(\d+)\s*[-–]\s*[Mm]anifest\s+(\d+)"),
            appinfo_name: re(r#""name"\s+"([^"]+)""#),
            depot: re(r"[Dd]epot\s+(\d+)"),
            manifest: re(r"[Mm]anifest\s+(\d+)"),
            build_id: re(r"[Bb]uild[Ii][Dd]\s*[=:]\s*(\d+)"),
            release_epoch: [
                re(r"(?i)timeupdated[^0-9]*(\d{9,})"),
                re(r"(?i)last\s*updated[^0-9]*(\d{9,})"),
                re(r"(?i)build(?:_|\s)*date[^0-9]*(\d{9,})"),
            ],
            manifest_created: re(r"(?i)Manifest\s+(\d+)\s+\((.+?)\)"),
            dotnet_time: re(
                r"(\d{1,2})/(\d{1,2})/(\d{4})\s+(\d{1,2}):(\d{2}):(\d{2})(?:\s*([AP]M))?",
            ),
            iso_time: re(r"(\d{4}-\d{2}-\d{2})[ T](\d{2}:\d{2}:\d{2})"),
            install_dir: re(r#"installdir\s*[=:]\s*"?([^"\n]+)"?"#),
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDepot {
    pub depot_id: String,
    pub manifest_id: String,
    pub name: Option<String>,
}

/// What the downloader's output said about the build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestSummary {
    /// Sorted by numeric depot id.
    pub depots: Vec<ScannedDepot>,
    pub primary_depot_id: Option<String>,
    pub build_id: Option<String>,
    pub build_datetime: Option<DateTime<Utc>>,
}

impl ManifestSummary {
    pub fn depot_name(&self, depot_id: &str) -> Option<&str> {
        self.depots
            .iter()
            .find(|d| d.depot_id == depot_id)
            .and_then(|d| d.name.as_deref())
    }
}

/// Accumulates depot, manifest, build id and timestamp facts from downloader
/// output, one line at a time. Fed by both the manifest-only preflight and
/// the download itself.
#[derive(Debug, Default)]
pub struct ManifestScan {
    manifests: HashMap<String, String>,
    /// `Manifest N` seen after a depot mention, used when no explicit pair shows up.
    loose: HashMap<String, String>,
    names: HashMap<String, String>,
    manifest_times: HashMap<String, DateTime<Utc>>,
    release_time: Option<DateTime<Utc>>,
    build_id: Option<String>,
    install_depot: Option<String>,
    last_depot: Option<String>,
}

impl ManifestScan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, line: &str) {
        let p = patterns();

        if let Some(c) = p.depot_name.captures(line) {
            let depot = c[1].to_string();
            self.names.insert(depot.clone(), c[2].to_string());
            self.last_depot = Some(depot);
            return;
        }
        if let Some(c) = p.depot_manifest.captures(line) {
            let depot = c[1].to_string();
            self.manifests.insert(depot.clone(), c[2].to_string());
            self.last_depot = Some(depot);
            return;
        }

        if let (Some(c), Some(depot)) = (p.appinfo_name.captures(line), &self.last_depot) {
            self.names.insert(depot.clone(), c[1].to_string());
        }
        if let Some(c) = p.depot.captures(line) {
            self.last_depot = Some(c[1].to_string());
        }
        if self.build_id.is_none() {
            self.build_id = p.build_id.captures(line).map(|c| c[1].to_string());
        }
        if self.release_time.is_none() {
            self.release_time = p
                .release_epoch
                .iter()
                .find_map(|re| re.captures(line))
                .and_then(|c| parse_epoch(&c[1]));
        }
        if let Some(c) = p.manifest_created.captures(line) {
            if let Some(ts) = parse_manifest_time(&c[2]) {
                self.manifest_times.insert(c[1].to_string(), ts);
            }
        }
        if let (Some(c), Some(depot)) = (p.manifest.captures(line), &self.last_depot) {
            self.loose.insert(depot.clone(), c[1].to_string());
        }
        if self.install_depot.is_none() && p.install_dir.is_match(line) {
            self.install_depot = self.last_depot.clone();
        }
    }

    /// Primary depot: the one the install dir was listed under, else the
    /// first non-shared depot, else the first. Build time: the app's release
    /// timestamp, else the primary depot's manifest creation time.
    pub fn summary(&self) -> ManifestSummary {
        let pairs = if self.manifests.is_empty() {
            &self.loose
        } else {
            &self.manifests
        };
        let mut depots: Vec<ScannedDepot> = pairs
            .iter()
            .map(|(depot, manifest)| ScannedDepot {
                depot_id: depot.clone(),
                manifest_id: manifest.clone(),
                name: self.names.get(depot).cloned(),
            })
            .collect();
        depots.sort_by_key(|d| (d.depot_id.parse::<u64>().unwrap_or(u64::MAX), d.depot_id.clone()));

        let primary_depot_id = self.install_depot.clone().or_else(|| {
            depots
                .iter()
                .find(|d| !is_shared_depot(&d.depot_id))
                .or_else(|| depots.first())
                .map(|d| d.depot_id.clone())
        });
        let build_datetime = self.release_time.or_else(|| {
            let primary = primary_depot_id.as_deref()?;
            let manifest = pairs.get(primary)?;
            self.manifest_times.get(manifest).copied()
        });

        ManifestSummary {
            depots,
            primary_depot_id,
            build_id: self.build_id.clone(),
            build_datetime,
        }
    }
}

fn parse_epoch(digits: &str) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(digits.parse().ok()?, 0).single()
}

/// `1/15/2024 10:30:45 AM` (month first, optional AM/PM) or `2024-01-15 10:30:45`.
fn parse_manifest_time(text: &str) -> Option<DateTime<Utc>> {
    let p = patterns();
    if let Some(c) = p.dotnet_time.captures(text) {
        let num = |i: usize| c[i].parse::<u32>().ok();
        let mut hour = num(4)?;
        match c.get(7).map(|m| m.as_str().to_ascii_uppercase()).as_deref() {
            Some("PM") if hour < 12 => hour += 12,
            Some("AM") if hour == 12 => hour = 0,
            _ => {}
        }
        let date = NaiveDate::from_ymd_opt(c[3].parse().ok()?, num(1)?, num(2)?)?;
        return Some(date.and_hms_opt(hour, num(5)?, num(6)?)?.and_utc());
    }
    let c = p.iso_time.captures(text)?;
    let naive =
        NaiveDateTime::parse_from_str(&format!("{} {}", &c[1], &c[2]), "%Y-%m-%d %H:%M:%S").ok()?;
    Some(naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(lines: &[&str]) -> ManifestSummary {
        let mut s = ManifestScan::new();
        lines.iter().for_each(|l| s.observe(l));
        s.summary()
    }

    fn ids(summary: &ManifestSummary) -> Vec<(&str, &str)> {
        summary
            .depots
            .iter()
            .map(|d| (d.depot_id.as_str(), d.manifest_id.as_str()))
            .collect()
    }

    #[test]
    fn depot_manifest_pairs_sorted_numerically() {
        let s = scan(&[
            "Depot 123457 - Manifest 1234567890123456789",
            "Depot 99 - Manifest 5",
            "Depot 123456 - Manifest 9876543210987654321",
        ]);
        assert_eq!(
            ids(&s),
            vec![
                ("99", "5"),
                ("123456", "9876543210987654321"),
                ("123457", "1234567890123456789")
            ]
        );
        assert_eq!(s.primary_depot_id.as_deref(), Some("99"));
    }

    #[test]
    fn build_id_first_match_wins() {
        let s = scan(&["Some info line", "buildid = 18674832", "BuildID: 1"]);
        assert_eq!(s.build_id.as_deref(), Some("18674832"));
    }

    #[test]
    fn primary_skips_shared_and_takes_its_manifest_time() {
        let s = scan(&[
            "Depot 228989 - Manifest 7206221393165260579",
            "Manifest 7206221393165260579 (7/14/2025 11:02:36 PM)",
            "Depot 2379781 - Manifest 4851806656204679952",
            "Manifest 4851806656204679952 (2/24/2025 10:02:36 PM)",
        ]);
        assert_eq!(s.primary_depot_id.as_deref(), Some("2379781"));
        let expected = Utc.with_ymd_and_hms(2025, 2, 24, 22, 2, 36).unwrap();
        assert_eq!(s.build_datetime, Some(expected));
    }

    #[test]
    fn manifest_time_may_precede_its_pair() {
        let s = scan(&[
            "Depot 123456 - Manifest 111",
            "Manifest 222 (1/10/2024 1:00:00 PM)",
            "Depot 123457 - Manifest 222",
            "Manifest 111 (2024-01-15 10:30:45)",
        ]);
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap();
        assert_eq!(s.build_datetime, Some(expected));
    }

    #[test]
    fn install_dir_marks_primary_depot() {
        let s = scan(&[
            "Depot 123456 - Manifest 111",
            "Depot 123457 - Manifest 222",
            "installdir = Common\\GameName",
            "Manifest 111 (1/10/2024 1:00:00 PM)",
            "Manifest 222 (12/5/2024 12:45:12 AM)",
        ]);
        assert_eq!(s.primary_depot_id.as_deref(), Some("123457"));
        let expected = Utc.with_ymd_and_hms(2024, 12, 5, 0, 45, 12).unwrap();
        assert_eq!(s.build_datetime, Some(expected));
    }

    #[test]
    fn release_timestamp_beats_manifest_time() {
        let s = scan(&[
            "Depot 441 - Manifest 800",
            "Manifest 800 (1/10/2024 1:00:00 PM)",
            "\"timeupdated\"  \"1740434556\"",
        ]);
        let expected = Utc.with_ymd_and_hms(2025, 2, 24, 22, 2, 36).unwrap();
        assert_eq!(s.build_datetime, Some(expected));
    }

    #[test]
    fn depot_names_from_quotes_and_appinfo() {
        let s = scan(&[
            "Depot 441 \"Game Content\"",
            "Depot 442 - Manifest 9",
            "\"name\"  \"Soundtrack\"",
            "Depot 441 - Manifest 8",
        ]);
        assert_eq!(s.depot_name("441"), Some("Game Content"));
        assert_eq!(s.depot_name("442"), Some("Soundtrack"));
        assert_eq!(s.depot_name("443"), None);
    }

    #[test]
    fn separate_depot_and_manifest_lines_pair_up() {
        let s = scan(&[
            "Downloading depot 441",
            "Got manifest 800",
            "Processing depot 442 manifest 900",
        ]);
        assert_eq!(ids(&s), vec![("441", "800"), ("442", "900")]);
    }

    #[test]
    fn unrelated_output_is_empty() {
        let s = scan(&["Connecting to Steam3...", "Done!"]);
        assert_eq!(s, ManifestSummary::default());
    }
}
