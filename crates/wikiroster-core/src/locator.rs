use crate::models::Section;

/// Find the first section whose title or anchor contains `keyword`,
/// case-insensitively.
///
/// Returns the section's index for a follow-up wikitext fetch, or
/// `None` when no section matches. Pages vary in heading style
/// ("Participants", "Teams &amp; Rosters" anchored as
/// "Teams_.26_Rosters"), which is why both fields are checked.
pub fn find_section_index(sections: &[Section], keyword: &str) -> Option<i64> {
    let keyword = keyword.to_lowercase();
    sections
        .iter()
        .find(|s| {
            s.title.to_lowercase().contains(&keyword) || s.anchor.to_lowercase().contains(&keyword)
        })
        .map(|s| s.index)
}
