/// Suffix the job uses for the per-group summary written next to its output CSV.
pub const SUMMARY_SUFFIX: &str = "_group_summary.json";

/// Derive the group summary path for an output CSV.
///
/// The final extension of the file name is replaced with [`SUMMARY_SUFFIX`];
/// a name without an extension gets the suffix appended. Dots in parent
/// directories and a leading dot in the file name are not extensions.
pub fn build_summary_path(output_csv: &str) -> String {
    if output_csv.is_empty() {
        return String::new();
    }
    let name_start = output_csv
        .rfind(['/', '\\'])
        .map(|idx| idx + 1)
        .unwrap_or(0);
    let stem_end = match output_csv[name_start..].rfind('.') {
        Some(0) | None => output_csv.len(),
        Some(dot) => name_start + dot,
    };
    format!("{}{SUMMARY_SUFFIX}", &output_csv[..stem_end])
}
