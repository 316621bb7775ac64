use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

/// How a percentage reads for job health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Health {
    Good,
    Fair,
    Poor,
}

impl Health {
    fn of_success(rate: f64) -> Self {
        if rate > 80.0 {
            Self::Good
        } else if rate >= 50.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    fn of_failure(rate: f64) -> Self {
        if rate >= 50.0 {
            Self::Poor
        } else if rate >= 25.0 {
            Self::Fair
        } else {
            Self::Good
        }
    }

    fn color(self) -> TableColor {
        match self {
            Self::Good => TableColor::Green,
            Self::Fair => TableColor::Yellow,
            Self::Poor => TableColor::Red,
        }
    }
}

/// Rounded-corner table with cyan column labels.
pub fn create_table(labels: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            labels
                .iter()
                .map(|label| Cell::new(*label).fg(TableColor::Cyan))
                .collect::<Vec<_>>(),
        );
    table
}

fn rate_cell(rate: f64, health: Health) -> Cell {
    Cell::new(format!("{rate:.1}%")).fg(health.color())
}

pub fn success_cell(rate: f64) -> Cell {
    rate_cell(rate, Health::of_success(rate))
}

pub fn failure_cell(rate: f64) -> Cell {
    rate_cell(rate, Health::of_failure(rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_bands() {
        assert_eq!(Health::of_success(80.1), Health::Good);
        assert_eq!(Health::of_success(80.0), Health::Fair);
        assert_eq!(Health::of_success(49.9), Health::Poor);
        assert_eq!(Health::of_failure(50.0), Health::Poor);
        assert_eq!(Health::of_failure(25.0), Health::Fair);
        assert_eq!(Health::of_failure(0.0), Health::Good);
    }

    #[test]
    fn test_rate_cells_format_one_decimal() {
        assert_eq!(success_cell(87.64).content(), "87.6%");
        assert_eq!(failure_cell(25.0).content(), "25.0%");
    }

    #[test]
    fn test_create_table_sets_header() {
        let table = create_table(&["#", "Pipeline"]);
        let rendered = table.to_string();
        assert!(rendered.contains("Pipeline"));
    }
}
