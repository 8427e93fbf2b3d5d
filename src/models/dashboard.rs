//! Category-breakdown response of the dashboard endpoint.

use serde::{Deserialize, Serialize};

/// Spend for one category within a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdownEntry {
    /// Category name as reported by the server.
    pub category: String,
    /// Total spent in the category.
    pub amount: f64,
}

/// Response of `GET /api/dashboard`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardResponse {
    /// Server-computed total; informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_spent: Option<f64>,
    /// One row per category with spending in the scope.
    #[serde(default)]
    pub category_breakdown: Vec<CategoryBreakdownEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_dashboard() {
        let json = r#"{
            "total_spent": 24.5,
            "category_breakdown": [
                {"category": "Eating Out", "amount": 4.5},
                {"category": "Bills", "amount": 20}
            ]
        }"#;
        let resp: DashboardResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.category_breakdown.len(), 2);
        assert_eq!(resp.category_breakdown[0].category, "Eating Out");
        assert_eq!(resp.total_spent, Some(24.5));
    }

    #[test]
    fn breakdown_only_response() {
        let resp: DashboardResponse =
            serde_json::from_str(r#"{"category_breakdown": []}"#).unwrap();
        assert!(resp.category_breakdown.is_empty());
        assert!(resp.total_spent.is_none());
    }
}
