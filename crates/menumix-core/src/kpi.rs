use polars::prelude::*;
use serde::Serialize;

/// Headline numbers over the filtered rows.
///
/// Totals are zero over an empty selection (and `None` only when the column is absent); the
/// average price is `None` whenever there is nothing to average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_net_revenue: Option<f64>,
    pub total_items_sold: Option<f64>,
    pub avg_net_price: Option<f64>,
}

impl KpiSummary {
    pub fn from_frame(df: &DataFrame) -> PolarsResult<Self> {
        Ok(Self {
            total_net_revenue: column_sum(df, "NetRevenue")?,
            total_items_sold: column_sum(df, "ItemsSold")?,
            avg_net_price: column_mean(df, "AvgNetPrice")?,
        })
    }

    pub fn net_revenue_display(&self) -> String {
        self.total_net_revenue
            .map(|value| format!("${}", group_thousands(value, 0)))
            .unwrap_or_else(|| "N/A".to_string())
    }

    pub fn items_sold_display(&self) -> String {
        self.total_items_sold
            .map(|value| group_thousands(value, 0))
            .unwrap_or_else(|| "N/A".to_string())
    }

    pub fn avg_net_price_display(&self) -> String {
        self.avg_net_price
            .map(|value| format!("${}", group_thousands(value, 2)))
            .unwrap_or_else(|| "N/A".to_string())
    }
}

fn column_sum(df: &DataFrame, name: &str) -> PolarsResult<Option<f64>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    Ok(Some(column.f64()?.into_iter().flatten().sum()))
}

fn column_mean(df: &DataFrame, name: &str) -> PolarsResult<Option<f64>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let (sum, count) = column
        .f64()?
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    Ok((count > 0).then(|| sum / count as f64))
}

/// `1234567.891` with two decimals → `1,234,567.89`.
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = match formatted.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, digit) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands_with_rounding() {
        assert_eq!(group_thousands(1_234_567.891, 2), "1,234,567.89");
        assert_eq!(group_thousands(999.6, 0), "1,000");
        assert_eq!(group_thousands(12.0, 2), "12.00");
        assert_eq!(group_thousands(-4_500.0, 0), "-4,500");
        assert_eq!(group_thousands(-0.001, 2), "0.00");
    }

    #[test]
    fn empty_selection_totals_zero_but_average_is_absent() {
        let df = df![
            "NetRevenue" => Vec::<Option<f64>>::new(),
            "ItemsSold" => Vec::<Option<f64>>::new(),
            "AvgNetPrice" => Vec::<Option<f64>>::new(),
        ]
        .expect("df");

        let kpis = KpiSummary::from_frame(&df).expect("kpis");
        assert_eq!(kpis.total_net_revenue, Some(0.0));
        assert_eq!(kpis.net_revenue_display(), "$0");
        assert_eq!(kpis.avg_net_price, None);
        assert_eq!(kpis.avg_net_price_display(), "N/A");
    }

    #[test]
    fn missing_columns_report_not_available() {
        let df = df!["ItemName" => &["Burger"]].expect("df");

        let kpis = KpiSummary::from_frame(&df).expect("kpis");
        assert_eq!(kpis.items_sold_display(), "N/A");
    }
}
