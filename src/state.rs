//! Cross-filter state: which chart drives the map, which one refines it,
//! and every chart's selected categories.

use crate::color::ColorRamp;
use crate::combine::union_sum;
use crate::config::{ChartConfig, ConfigError, DashboardConfig, MapConfig, Relations};
use crate::relation::{RelationNotFound, RelationTable};
use crate::series::AggregateSeries;
use crate::store::{Dimension, DimensionalStore, RecordStore};
use crate::view::DashboardView;
use indexmap::IndexSet;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// Registration index of a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChartId(pub usize);

impl fmt::Display for ChartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which charts currently drive the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FilterPointer {
    #[default]
    Unfiltered,
    PrimaryOnly(ChartId),
    /// Only reachable when `sub` is a declared child of `primary`.
    PrimaryAndSub(ChartId, ChartId),
}

impl FilterPointer {
    pub fn primary(self) -> Option<ChartId> {
        match self {
            Self::Unfiltered => None,
            Self::PrimaryOnly(p) | Self::PrimaryAndSub(p, _) => Some(p),
        }
    }

    pub fn sub(self) -> Option<ChartId> {
        match self {
            Self::PrimaryAndSub(_, s) => Some(s),
            _ => None,
        }
    }

    pub fn involves(self, chart: ChartId) -> bool {
        self.primary() == Some(chart) || self.sub() == Some(chart)
    }
}

/// What a click landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Chart(ChartId),
    Map,
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    RelationNotFound(#[from] RelationNotFound),
    #[error("Unknown chart: {0}")]
    UnknownChart(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// The click changed nothing, so no refresh ran.
    Ignored,
    Refreshed(DashboardView),
}

#[derive(Debug, Clone)]
pub struct Chart<S> {
    id: ChartId,
    name: String,
    config: ChartConfig,
    ramp: ColorRamp,
    selection: IndexSet<String>,
    store: S,
    initial_max: f64,
}

impl<S: DimensionalStore> Chart<S> {
    pub fn id(&self) -> ChartId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn ramp(&self) -> &ColorRamp {
        &self.ramp
    }

    /// Selected categories in click order.
    pub fn selection(&self) -> &IndexSet<String> {
        &self.selection
    }

    pub fn has_active_selection(&self) -> bool {
        !self.selection.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Category maximum at setup; the axis of non-elastic charts.
    pub fn initial_max(&self) -> f64 {
        self.initial_max
    }

    pub fn categories(&self) -> AggregateSeries {
        self.store.group_all(Dimension::Category)
    }

    pub fn places(&self) -> AggregateSeries {
        self.store.group_all(Dimension::Place)
    }

    /// Selection joined with ` + `, as shown in titles and popups.
    pub fn print_filters(&self) -> String {
        self.selection
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" + ")
    }

    fn clear(&mut self) {
        self.selection.clear();
        self.store.filter_all(Dimension::Category);
    }

    fn push_filter(&mut self) {
        if self.selection.is_empty() {
            self.store.filter_all(Dimension::Category);
        } else {
            self.store.filter(Dimension::Category, &self.selection);
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapState {
    config: MapConfig,
    colors: ColorRamp,
    merge_colors: ColorRamp,
    selection: IndexSet<String>,
    has_values: HashSet<String>,
}

impl MapState {
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn colors(&self) -> &ColorRamp {
        &self.colors
    }

    pub fn merge_colors(&self) -> &ColorRamp {
        &self.merge_colors
    }

    pub fn selection(&self) -> &IndexSet<String> {
        &self.selection
    }

    /// Places with a non-zero total at setup; only these accept clicks.
    pub fn has_value(&self, place: &str) -> bool {
        self.has_values.contains(place)
    }
}

/// The whole dashboard: charts, map, relations, and the filter pointer.
#[derive(Debug, Clone)]
pub struct DashboardState<S = RecordStore> {
    charts: Vec<Chart<S>>,
    map: MapState,
    relations: RelationTable,
    pointer: FilterPointer,
}

impl DashboardState<RecordStore> {
    pub fn from_config(config: &DashboardConfig) -> Result<Self, DashboardError> {
        let mut charts = Vec::with_capacity(config.charts.len());
        for (index, spec) in config.charts.iter().enumerate() {
            let label = spec
                .config
                .name
                .clone()
                .unwrap_or_else(|| default_name(index));
            let records = spec.config.records(&label, &spec.data)?;
            charts.push((spec.config.clone(), RecordStore::new(records)));
        }
        Self::new(charts, config.map.clone(), &config.relations)
    }

    pub fn from_json(json: &str) -> Result<Self, DashboardError> {
        let config = DashboardConfig::from_json(json)?;
        Self::from_config(&config)
    }
}

impl<S: DimensionalStore> DashboardState<S> {
    /// Register charts in order, resolve relation names, and take the
    /// initial aggregates.
    pub fn new(
        charts: Vec<(ChartConfig, S)>,
        map: MapConfig,
        relations: &Relations,
    ) -> Result<Self, DashboardError> {
        let mut registered: Vec<Chart<S>> = Vec::with_capacity(charts.len());
        let mut by_name: HashMap<String, ChartId> = HashMap::new();

        for (index, (config, store)) in charts.into_iter().enumerate() {
            let id = ChartId(index);
            let name = config.name.clone().unwrap_or_else(|| default_name(index));
            config.validate(&name)?;
            if by_name.insert(name.clone(), id).is_some() {
                return Err(ConfigError::DuplicateChart(name).into());
            }
            let ramp = config.ramp(&name)?;
            let initial_max = store.group_all(Dimension::Category).max();
            registered.push(Chart {
                id,
                name,
                config,
                ramp,
                selection: IndexSet::new(),
                store,
                initial_max,
            });
        }

        let resolve = |name: &str| {
            by_name
                .get(name)
                .copied()
                .ok_or_else(|| ConfigError::UnknownChart(name.to_string()))
        };
        let mut edges = Vec::new();
        for (parent, specs) in relations {
            let parent = resolve(parent.as_str())?;
            for spec in specs {
                edges.push((parent, resolve(spec.graph.as_str())?, spec.operation));
            }
        }

        map.validate()?;
        let (colors, merge_colors) = map.ramps()?;

        let totals = registered
            .iter()
            .fold(AggregateSeries::new(), |acc, chart| union_sum(&acc, &chart.places()));
        let has_values = totals
            .iter()
            .filter(|(_, v)| *v != 0.0)
            .map(|(k, _)| k.to_string())
            .collect();

        Ok(Self {
            charts: registered,
            map: MapState {
                config: map,
                colors,
                merge_colors,
                selection: IndexSet::new(),
                has_values,
            },
            relations: RelationTable::new(edges),
            pointer: FilterPointer::Unfiltered,
        })
    }

    pub fn charts(&self) -> &[Chart<S>] {
        &self.charts
    }

    pub fn chart(&self, id: ChartId) -> Option<&Chart<S>> {
        self.charts.get(id.0)
    }

    pub fn chart_id(&self, name: &str) -> Option<ChartId> {
        self.charts.iter().find(|c| c.name == name).map(|c| c.id)
    }

    pub fn map(&self) -> &MapState {
        &self.map
    }

    pub fn relations(&self) -> &RelationTable {
        &self.relations
    }

    pub fn pointer(&self) -> FilterPointer {
        self.pointer
    }

    /// Apply a click and refresh.
    pub fn handle_click(
        &mut self,
        entity: Entity,
        key: &str,
    ) -> Result<ClickOutcome, DashboardError> {
        let changed = match entity {
            Entity::Chart(chart) => {
                self.apply_chart_click(chart, key)?;
                true
            }
            Entity::Map => self.apply_map_click(key),
        };
        if changed {
            Ok(ClickOutcome::Refreshed(self.refresh()?))
        } else {
            Ok(ClickOutcome::Ignored)
        }
    }

    pub fn click_chart(&mut self, chart: ChartId, key: &str) -> Result<ClickOutcome, DashboardError> {
        self.handle_click(Entity::Chart(chart), key)
    }

    pub fn click_map(&mut self, place: &str) -> Result<ClickOutcome, DashboardError> {
        self.handle_click(Entity::Map, place)
    }

    /// Toggle `key` in chart `c` and move the pointer, without refreshing.
    pub fn apply_chart_click(&mut self, c: ChartId, key: &str) -> Result<(), DashboardError> {
        if c.0 >= self.charts.len() {
            return Err(DashboardError::UnknownChart(c.to_string()));
        }
        let before = self.pointer;

        self.pointer = match self.pointer {
            FilterPointer::Unfiltered => FilterPointer::PrimaryOnly(c),
            FilterPointer::PrimaryOnly(p) if p == c => FilterPointer::PrimaryOnly(c),
            FilterPointer::PrimaryOnly(p) if self.relations.is_child_of(c, p) => {
                FilterPointer::PrimaryAndSub(p, c)
            }
            FilterPointer::PrimaryAndSub(p, s) if c == p || c == s => self.pointer,
            _ => FilterPointer::PrimaryOnly(c),
        };

        let chart = &mut self.charts[c.0];
        if !chart.selection.shift_remove(key) {
            chart.selection.insert(key.to_string());
        }

        // A sub-filter that empties hands the map back to its primary; an
        // emptied primary drops every filter pointer.
        if chart.selection.is_empty() {
            self.pointer = match self.pointer {
                FilterPointer::PrimaryAndSub(p, s) if s == c => FilterPointer::PrimaryOnly(p),
                _ => FilterPointer::Unfiltered,
            };
        }

        let pointer = self.pointer;
        for chart in self.charts.iter_mut().filter(|ch| !pointer.involves(ch.id)) {
            chart.clear();
        }
        self.charts[c.0].push_filter();

        if before != self.pointer {
            debug!("Filter pointer {:?} -> {:?} after click on chart {}", before, self.pointer, c);
        }
        Ok(())
    }

    /// Toggle `place` in the map selection; false when the place holds no
    /// values and the click is ignored.
    pub fn apply_map_click(&mut self, place: &str) -> bool {
        if !self.map.has_value(place) {
            debug!("Ignoring map click on {} (no values)", place);
            return false;
        }
        if !self.map.selection.shift_remove(place) {
            self.map.selection.insert(place.to_string());
        }

        for chart in &mut self.charts {
            if self.map.selection.is_empty() {
                chart.store.filter_all(Dimension::Place);
            } else {
                chart.store.filter(Dimension::Place, &self.map.selection);
            }
        }
        true
    }
}

fn default_name(index: usize) -> String {
    format!("chart_{index}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::Operation;
    use crate::store::Record;
    use pretty_assertions::assert_eq;

    const X: ChartId = ChartId(0);
    const Y: ChartId = ChartId(1);
    const Z: ChartId = ChartId(2);

    fn chart(name: &str) -> ChartConfig {
        ChartConfig::builder()
            .name(name)
            .place("place")
            .category("category")
            .value("value")
            .build()
            .unwrap()
    }

    fn store(records: &[(&str, &str, f64)]) -> RecordStore {
        RecordStore::new(
            records
                .iter()
                .map(|(p, c, v)| Record::new(*p, *c, *v))
                .collect(),
        )
    }

    fn dashboard() -> DashboardState {
        let mut relations = Relations::new();
        relations.insert(
            "x".to_string(),
            vec![crate::config::RelationSpec {
                graph: "y".to_string(),
                operation: Operation::Subtract,
            }],
        );
        DashboardState::new(
            vec![
                (chart("x"), store(&[("p1", "a", 10.0), ("p2", "b", 4.0)])),
                (chart("y"), store(&[("p1", "b", 5.0), ("p3", "c", 2.0)])),
                (chart("z"), store(&[("p2", "c", 1.0), ("p4", "d", 0.0)])),
            ],
            MapConfig::default(),
            &relations,
        )
        .unwrap()
    }

    fn selection(state: &DashboardState, id: ChartId) -> Vec<&str> {
        state.chart(id).unwrap().selection().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_click_toggles_primary() {
        let mut state = dashboard();
        state.apply_chart_click(X, "a").unwrap();
        assert_eq!(state.pointer(), FilterPointer::PrimaryOnly(X));
        assert_eq!(selection(&state, X), vec!["a"]);
        assert!(state.chart(X).unwrap().store().is_filtered(Dimension::Category));

        state.apply_chart_click(X, "a").unwrap();
        assert_eq!(state.pointer(), FilterPointer::Unfiltered);
        assert!(selection(&state, X).is_empty());
        assert!(!state.chart(X).unwrap().store().is_filtered(Dimension::Category));
    }

    #[test]
    fn test_same_chart_keeps_primary() {
        let mut state = dashboard();
        state.apply_chart_click(X, "a").unwrap();
        state.apply_chart_click(X, "b").unwrap();
        assert_eq!(state.pointer(), FilterPointer::PrimaryOnly(X));
        assert_eq!(selection(&state, X), vec!["a", "b"]);
        assert_eq!(state.chart(X).unwrap().print_filters(), "a + b");

        state.apply_chart_click(X, "a").unwrap();
        assert_eq!(state.pointer(), FilterPointer::PrimaryOnly(X));
        assert_eq!(selection(&state, X), vec!["b"]);
    }

    #[test]
    fn test_related_chart_becomes_sub() {
        let mut state = dashboard();
        state.apply_chart_click(X, "a").unwrap();
        state.apply_chart_click(Y, "b").unwrap();

        assert_eq!(state.pointer(), FilterPointer::PrimaryAndSub(X, Y));
        assert_eq!(selection(&state, X), vec!["a"]);
        assert_eq!(selection(&state, Y), vec!["b"]);
        assert!(state.chart(X).unwrap().store().is_filtered(Dimension::Category));
    }

    #[test]
    fn test_unrelated_chart_takes_over() {
        let mut state = dashboard();
        state.apply_chart_click(X, "a").unwrap();
        state.apply_chart_click(Y, "b").unwrap();
        state.apply_chart_click(Z, "c").unwrap();

        assert_eq!(state.pointer(), FilterPointer::PrimaryOnly(Z));
        assert!(selection(&state, X).is_empty());
        assert!(selection(&state, Y).is_empty());
        assert_eq!(selection(&state, Z), vec!["c"]);
        assert!(!state.chart(X).unwrap().store().is_filtered(Dimension::Category));
        assert!(!state.chart(Y).unwrap().store().is_filtered(Dimension::Category));
    }

    #[test]
    fn test_unrelated_from_primary_only() {
        let mut state = dashboard();
        state.apply_chart_click(X, "a").unwrap();
        state.apply_chart_click(Z, "d").unwrap();
        assert_eq!(state.pointer(), FilterPointer::PrimaryOnly(Z));
        assert!(selection(&state, X).is_empty());
    }

    #[test]
    fn test_parent_is_not_child_of_its_child() {
        let mut state = dashboard();
        state.apply_chart_click(Y, "b").unwrap();
        state.apply_chart_click(X, "a").unwrap();
        assert_eq!(state.pointer(), FilterPointer::PrimaryOnly(X));
        assert!(selection(&state, Y).is_empty());
    }

    #[test]
    fn test_sub_toggles_and_collapses() {
        let mut state = dashboard();
        state.apply_chart_click(X, "a").unwrap();
        state.apply_chart_click(Y, "b").unwrap();
        state.apply_chart_click(Y, "c").unwrap();
        assert_eq!(state.pointer(), FilterPointer::PrimaryAndSub(X, Y));
        assert_eq!(selection(&state, Y), vec!["b", "c"]);

        state.apply_chart_click(X, "b").unwrap();
        assert_eq!(state.pointer(), FilterPointer::PrimaryAndSub(X, Y));
        assert_eq!(selection(&state, X), vec!["a", "b"]);

        state.apply_chart_click(Y, "b").unwrap();
        state.apply_chart_click(Y, "c").unwrap();
        assert_eq!(state.pointer(), FilterPointer::PrimaryOnly(X));
        assert!(selection(&state, Y).is_empty());
        assert_eq!(selection(&state, X), vec!["a", "b"]);
    }

    #[test]
    fn test_emptied_primary_drops_sub() {
        let mut state = dashboard();
        state.apply_chart_click(X, "a").unwrap();
        state.apply_chart_click(Y, "b").unwrap();
        state.apply_chart_click(X, "a").unwrap();

        assert_eq!(state.pointer(), FilterPointer::Unfiltered);
        assert!(selection(&state, Y).is_empty());
        assert!(!state.chart(Y).unwrap().store().is_filtered(Dimension::Category));
    }

    #[test]
    fn test_unknown_chart() {
        let mut state = dashboard();
        assert!(matches!(
            state.apply_chart_click(ChartId(9), "a"),
            Err(DashboardError::UnknownChart(_))
        ));
        assert_eq!(state.pointer(), FilterPointer::Unfiltered);
    }

    #[test]
    fn test_map_click_filters_every_chart() {
        let mut state = dashboard();
        assert!(state.apply_map_click("p1"));
        assert_eq!(
            state.map().selection().iter().collect::<Vec<_>>(),
            vec!["p1"]
        );
        assert!(state
            .charts()
            .iter()
            .all(|c| c.store().is_filtered(Dimension::Place)));
        assert_eq!(state.chart(X).unwrap().categories().get("b"), Some(0.0));

        assert!(state.apply_map_click("p1"));
        assert!(state.map().selection().is_empty());
        assert!(state
            .charts()
            .iter()
            .all(|c| !c.store().is_filtered(Dimension::Place)));
    }

    #[test]
    fn test_map_click_without_values_ignored() {
        let mut state = dashboard();
        // p4 only carries a zero value
        assert!(!state.apply_map_click("p4"));
        assert!(!state.apply_map_click("nowhere"));
        assert!(state.map().selection().is_empty());
        assert!(matches!(state.click_map("p4"), Ok(ClickOutcome::Ignored)));
    }

    #[test]
    fn test_map_filter_survives_chart_clicks() {
        let mut state = dashboard();
        state.apply_map_click("p2");
        state.apply_chart_click(X, "b").unwrap();
        state.apply_chart_click(Z, "c").unwrap();
        assert!(state.chart(X).unwrap().store().is_filtered(Dimension::Place));
    }

    #[test]
    fn test_default_names_and_duplicates() {
        let unnamed = ChartConfig::builder()
            .place("p")
            .category("c")
            .value("v")
            .build()
            .unwrap();
        let state = DashboardState::new(
            vec![(unnamed, RecordStore::default())],
            MapConfig::default(),
            &Relations::new(),
        )
        .unwrap();
        assert_eq!(state.chart_id("chart_0"), Some(ChartId(0)));

        let dup = DashboardState::new(
            vec![
                (chart("a"), RecordStore::default()),
                (chart("a"), RecordStore::default()),
            ],
            MapConfig::default(),
            &Relations::new(),
        );
        assert!(matches!(
            dup,
            Err(DashboardError::Config(ConfigError::DuplicateChart(_)))
        ));
    }

    #[test]
    fn test_relation_to_unknown_chart() {
        let config = DashboardConfig::default()
            .chart(chart("a"), Vec::new())
            .relation("a", "ghost", Operation::Divide);
        assert!(matches!(
            DashboardState::from_config(&config),
            Err(DashboardError::Config(ConfigError::UnknownChart(name))) if name == "ghost"
        ));
    }
}
