use serde::{Deserialize, Serialize};

/// A business the user can point the assistant at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessSummary {
    pub business_id: String,
    pub name: String,
    pub description: String,
}

impl BusinessSummary {
    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

/// Case-insensitive substring filter over name and description.
///
/// A blank query yields every business. The input slice is never modified.
pub fn filter_businesses<'a>(
    businesses: &'a [BusinessSummary],
    query: &str,
) -> Vec<&'a BusinessSummary> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return businesses.iter().collect();
    }

    businesses
        .iter()
        .filter(|business| business.matches(&needle))
        .collect()
}
