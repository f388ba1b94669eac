//! Category router
//!
//! Pure, total mapping from a category to a graph destination. Any label
//! outside the known set goes to the direct reply path.

use crate::models::{Category, Destination};

pub fn route(category: &Category) -> Destination {
    match category {
        Category::StockAnalysis | Category::StockNews | Category::StockComparison => {
            Destination::Stock
        }
        Category::CityWeather => Destination::City,
        Category::Other => Destination::Search,
        Category::Unrecognized(_) => Destination::Reply,
    }
}

/// Route a raw label as produced by the classifier.
pub fn route_label(label: &str) -> Destination {
    route(&Category::from_label(label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_categories() {
        assert_eq!(route(&Category::StockAnalysis), Destination::Stock);
        assert_eq!(route(&Category::StockNews), Destination::Stock);
        assert_eq!(route(&Category::StockComparison), Destination::Stock);
        assert_eq!(route(&Category::CityWeather), Destination::City);
        assert_eq!(route(&Category::Other), Destination::Search);
    }

    #[test]
    fn test_labels_match_wire_names() {
        let cases = [
            ("stock_analysis", "stock"),
            ("stock_news", "stock"),
            ("stock_comparison", "stock"),
            ("city_weather", "city"),
            ("other", "search"),
        ];
        for (label, destination) in cases {
            assert_eq!(route_label(label).as_str(), destination);
        }
    }

    #[test]
    fn test_unknown_labels_fall_back_to_reply() {
        for label in ["", "   ", "weather", "stock", "OTHER_STUFF", "🚀", "city_weather_v2"] {
            assert_eq!(route_label(label), Destination::Reply, "label {:?}", label);
        }
    }
}
