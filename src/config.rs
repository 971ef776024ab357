//! Dashboard setup: chart and map options, relations, and the JSON surface.

use crate::color::{ColorRamp, Rgb};
use crate::relation::Operation;
use crate::store::Record;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Row = serde_json::Map<String, Value>;

/// Parent chart name -> charts allowed to sub-filter it.
pub type Relations = IndexMap<String, Vec<RelationSpec>>;

pub const DEFAULT_BAR_COLOR: &str = "#0091EA";
pub const DEFAULT_MAP_COLORS: [&str; 5] = ["#CCCCCC", "#81D4FA", "#29B6F6", "#0288D1", "#01579B"];
pub const DEFAULT_MERGE_COLORS: [&str; 5] = ["#CCCCCC", "#FFECB3", "#FFC107", "#FFA000", "#FF6F00"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid color: {0}")]
    InvalidColor(String),
    #[error("Color ramp for {owner} needs 5 colors, got {len}")]
    InvalidRamp { owner: String, len: usize },
    #[error("Chart {chart}: `{field}` field name is empty")]
    EmptyField { chart: String, field: &'static str },
    #[error("Chart {chart}: width and height must be positive")]
    InvalidSize { chart: String },
    #[error("Map join attribute is empty")]
    EmptyJoinAttr,
    #[error("Duplicate chart name: {0}")]
    DuplicateChart(String),
    #[error("Unknown chart in relations: {0}")]
    UnknownChart(String),
    #[error("Chart {chart} row {row}: missing field `{field}`")]
    MissingField {
        chart: String,
        row: usize,
        field: String,
    },
    #[error("Chart {chart} row {row}: field `{field}` is not numeric")]
    InvalidValue {
        chart: String,
        row: usize,
        field: String,
    },
    #[error("Invalid dashboard JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartConfig {
    /// Defaults to `chart_<registration index>`.
    pub name: Option<String>,
    pub height: f64,
    pub width: f64,
    pub bar_color: String,
    /// Explicit map ramp; empty derives one from `bar_color`.
    pub map_colors: Vec<String>,
    /// Rescale the value axis to the current maximum on every refresh.
    pub elastic_axis: bool,
    pub place: String,
    #[serde(alias = "type")]
    pub category: String,
    #[serde(alias = "values")]
    pub value: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            name: None,
            height: 300.0,
            width: 300.0,
            bar_color: DEFAULT_BAR_COLOR.to_string(),
            map_colors: Vec::new(),
            elastic_axis: false,
            place: String::new(),
            category: String::new(),
            value: String::new(),
        }
    }
}

impl ChartConfig {
    pub fn builder() -> ChartConfigBuilder {
        ChartConfigBuilder::default()
    }

    pub fn validate(&self, label: &str) -> Result<(), ConfigError> {
        for (field, name) in [
            ("place", &self.place),
            ("category", &self.category),
            ("value", &self.value),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyField {
                    chart: label.to_string(),
                    field,
                });
            }
        }
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(ConfigError::InvalidSize {
                chart: label.to_string(),
            });
        }
        self.ramp(label).map(|_| ())
    }

    /// The chart's map ramp: explicit colors, or derived from the bar color.
    pub fn ramp(&self, label: &str) -> Result<ColorRamp, ConfigError> {
        let base = parse_color(&self.bar_color)?;
        if self.map_colors.is_empty() {
            Ok(ColorRamp::derived(base))
        } else {
            explicit_ramp(label, &self.map_colors)
        }
    }

    /// Pull `(place, category, value)` out of each row by the configured
    /// field names.
    pub fn records(&self, label: &str, rows: &[Row]) -> Result<Vec<Record>, ConfigError> {
        rows.iter()
            .enumerate()
            .map(|(row, data)| -> Result<Record, ConfigError> {
                let missing = |field: &str| ConfigError::MissingField {
                    chart: label.to_string(),
                    row,
                    field: field.to_string(),
                };
                let place = data
                    .get(&self.place)
                    .and_then(key_of)
                    .ok_or_else(|| missing(&self.place))?;
                let category = data
                    .get(&self.category)
                    .and_then(key_of)
                    .ok_or_else(|| missing(&self.category))?;
                let raw = data.get(&self.value).ok_or_else(|| missing(&self.value))?;
                let value = number_of(raw).ok_or_else(|| ConfigError::InvalidValue {
                    chart: label.to_string(),
                    row,
                    field: self.value.clone(),
                })?;
                Ok(Record {
                    place,
                    category,
                    value,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChartConfigBuilder {
    config: ChartConfig,
}

impl ChartConfigBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    pub fn height(mut self, height: f64) -> Self {
        self.config.height = height;
        self
    }

    pub fn width(mut self, width: f64) -> Self {
        self.config.width = width;
        self
    }

    pub fn bar_color(mut self, color: impl Into<String>) -> Self {
        self.config.bar_color = color.into();
        self
    }

    pub fn map_colors<S: Into<String>>(mut self, colors: impl IntoIterator<Item = S>) -> Self {
        self.config.map_colors = colors.into_iter().map(Into::into).collect();
        self
    }

    pub fn elastic_axis(mut self, elastic: bool) -> Self {
        self.config.elastic_axis = elastic;
        self
    }

    pub fn place(mut self, field: impl Into<String>) -> Self {
        self.config.place = field.into();
        self
    }

    pub fn category(mut self, field: impl Into<String>) -> Self {
        self.config.category = field.into();
        self
    }

    pub fn value(mut self, field: impl Into<String>) -> Self {
        self.config.value = field.into();
        self
    }

    pub fn build(self) -> Result<ChartConfig, ConfigError> {
        let label = self.config.name.clone().unwrap_or_else(|| "chart".to_string());
        self.config.validate(&label)?;
        Ok(self.config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapConfig {
    /// Region property joined against chart place keys.
    pub join_attr: String,
    /// Region property shown in the hover info; none disables it.
    pub info_attr: Option<String>,
    /// Ramp while no chart is filtered.
    pub colors: Vec<String>,
    /// Ramp while a primary and sub filter are combined.
    pub merge_colors: Vec<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            join_attr: "id".to_string(),
            info_attr: None,
            colors: DEFAULT_MAP_COLORS.map(String::from).to_vec(),
            merge_colors: DEFAULT_MERGE_COLORS.map(String::from).to_vec(),
        }
    }
}

impl MapConfig {
    pub fn builder() -> MapConfigBuilder {
        MapConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.join_attr.trim().is_empty() {
            return Err(ConfigError::EmptyJoinAttr);
        }
        self.ramps().map(|_| ())
    }

    /// `(colors, merge_colors)` as ramps.
    pub fn ramps(&self) -> Result<(ColorRamp, ColorRamp), ConfigError> {
        Ok((
            explicit_ramp("map colors", &self.colors)?,
            explicit_ramp("map merge colors", &self.merge_colors)?,
        ))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MapConfigBuilder {
    config: MapConfig,
}

impl MapConfigBuilder {
    pub fn join_attr(mut self, attr: impl Into<String>) -> Self {
        self.config.join_attr = attr.into();
        self
    }

    pub fn info_attr(mut self, attr: impl Into<String>) -> Self {
        self.config.info_attr = Some(attr.into());
        self
    }

    pub fn colors<S: Into<String>>(mut self, colors: impl IntoIterator<Item = S>) -> Self {
        self.config.colors = colors.into_iter().map(Into::into).collect();
        self
    }

    pub fn merge_colors<S: Into<String>>(mut self, colors: impl IntoIterator<Item = S>) -> Self {
        self.config.merge_colors = colors.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<MapConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationSpec {
    /// Name of the chart that may sub-filter the parent.
    pub graph: String,
    pub operation: Operation,
}

/// A chart's options plus the rows it aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(flatten)]
    pub config: ChartConfig,
    #[serde(default)]
    pub data: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub charts: Vec<ChartSpec>,
    pub map: MapConfig,
    pub relations: Relations,
}

impl DashboardConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn chart(mut self, config: ChartConfig, data: Vec<Row>) -> Self {
        self.charts.push(ChartSpec { config, data });
        self
    }

    pub fn map(mut self, map: MapConfig) -> Self {
        self.map = map;
        self
    }

    /// Declare `child` as a sub-filter of `parent`.
    pub fn relation(
        mut self,
        parent: impl Into<String>,
        child: impl Into<String>,
        operation: Operation,
    ) -> Self {
        self.relations.entry(parent.into()).or_default().push(RelationSpec {
            graph: child.into(),
            operation,
        });
        self
    }
}

fn parse_color(s: &str) -> Result<Rgb, ConfigError> {
    Rgb::parse(s).ok_or_else(|| ConfigError::InvalidColor(s.to_string()))
}

fn explicit_ramp(owner: &str, colors: &[String]) -> Result<ColorRamp, ConfigError> {
    for c in colors {
        parse_color(c)?;
    }
    ColorRamp::from_slice(colors).ok_or_else(|| ConfigError::InvalidRamp {
        owner: owner.to_string(),
        len: colors.len(),
    })
}

fn key_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Null => Some(0.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: Value) -> Vec<Row> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let config = ChartConfig::builder()
            .place("district")
            .category("sector")
            .value("people")
            .build()
            .unwrap();

        assert_eq!(config.width, 300.0);
        assert_eq!(config.bar_color, DEFAULT_BAR_COLOR);
        assert!(config.name.is_none());
        assert_eq!(config.ramp("c").unwrap().color(4), "#0091ea");
    }

    #[test]
    fn test_builder_rejects_bad_input() {
        let base = || ChartConfig::builder().place("p").category("c").value("v");

        assert!(matches!(
            ChartConfig::builder().place("p").value("v").build(),
            Err(ConfigError::EmptyField { field: "category", .. })
        ));
        assert!(matches!(
            base().bar_color("blue").build(),
            Err(ConfigError::InvalidColor(_))
        ));
        assert!(matches!(
            base().map_colors(["#000", "#111"]).build(),
            Err(ConfigError::InvalidRamp { len: 2, .. })
        ));
        assert!(matches!(
            base().width(0.0).build(),
            Err(ConfigError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_map_builder() {
        let map = MapConfig::builder()
            .join_attr("P_CODE")
            .info_attr("NAME")
            .build()
            .unwrap();
        let (colors, merge) = map.ramps().unwrap();
        assert_eq!(colors.color(1), "#81D4FA");
        assert_eq!(merge.color(4), "#FF6F00");

        assert!(matches!(
            MapConfig::builder().join_attr(" ").build(),
            Err(ConfigError::EmptyJoinAttr)
        ));
    }

    #[test]
    fn test_records_from_rows() {
        let config = ChartConfig::builder()
            .place("pcode")
            .category("type")
            .value("count")
            .build()
            .unwrap();
        let data = rows(json!([
            {"pcode": "A1", "type": "food", "count": 3},
            {"pcode": 42, "type": "water", "count": "2.5"},
            {"pcode": "A2", "type": "food", "count": null}
        ]));

        let records = config.records("c", &data).unwrap();
        assert_eq!(records[0], Record::new("A1", "food", 3.0));
        assert_eq!(records[1], Record::new("42", "water", 2.5));
        assert_eq!(records[2].value, 0.0);
    }

    #[test]
    fn test_records_errors() {
        let config = ChartConfig::builder()
            .place("pcode")
            .category("type")
            .value("count")
            .build()
            .unwrap();

        let missing = rows(json!([{"pcode": "A1", "count": 1}]));
        assert!(matches!(
            config.records("c", &missing),
            Err(ConfigError::MissingField { row: 0, .. })
        ));

        let bad = rows(json!([
            {"pcode": "A1", "type": "x", "count": 1},
            {"pcode": "A1", "type": "x", "count": "lots"}
        ]));
        assert!(matches!(
            config.records("c", &bad),
            Err(ConfigError::InvalidValue { row: 1, .. })
        ));
    }

    #[test]
    fn test_dashboard_from_json() {
        let config = DashboardConfig::from_json(
            r##"{
                "charts": [
                    {"name": "needs", "place": "p", "type": "sector", "values": "n",
                     "barColor": "#ff0000", "data": [{"p": "A", "sector": "food", "n": 1}]},
                    {"place": "p", "category": "sector", "value": "n", "elasticAxis": true}
                ],
                "map": {"joinAttr": "code"},
                "relations": {"needs": [{"graph": "chart_1", "operation": "/"}]}
            }"##,
        )
        .unwrap();

        assert_eq!(config.charts.len(), 2);
        assert_eq!(config.charts[0].config.category, "sector");
        assert_eq!(config.charts[0].config.value, "n");
        assert_eq!(config.charts[0].data.len(), 1);
        assert!(config.charts[1].config.elastic_axis);
        assert_eq!(config.map.join_attr, "code");
        assert_eq!(config.map.colors.len(), 5);
        assert_eq!(config.relations["needs"][0].operation, Operation::Divide);
    }

    #[test]
    fn test_relation_builder() {
        let config = DashboardConfig::default()
            .relation("a", "b", Operation::Subtract)
            .relation("a", "c", Operation::Divide);
        assert_eq!(config.relations["a"].len(), 2);
        assert_eq!(config.relations["a"][1].graph, "c");
    }
}
