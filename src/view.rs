//! Global refresh: recompute every aggregate and derive what the renderer
//! draws.

use crate::color::{ColorRamp, Legend, tier};
use crate::combine::{combine, union_sum};
use crate::series::AggregateSeries;
use crate::state::{Chart, ChartId, DashboardError, DashboardState, FilterPointer};
use crate::store::DimensionalStore;
use serde::Serialize;
use tracing::trace;

/// Bars outside the active selection, and charts sidelined by another
/// chart's filter.
pub const INACTIVE_BAR: &str = "#dddddd";

/// Regions outside the map selection.
pub const UNSELECTED_REGION: &str = "grey";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub key: String,
    pub value: f64,
    pub fill: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartView {
    pub id: ChartId,
    pub name: String,
    pub width: f64,
    pub height: f64,
    pub axis_max: f64,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub place: String,
    pub value: f64,
    pub tier: usize,
    pub fill: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub regions: Vec<Region>,
    pub max: f64,
    /// The series the map is colored by.
    pub current: AggregateSeries,
    /// The primary chart's place aggregate, or the map total when unfiltered.
    pub primary: AggregateSeries,
    /// The sub-filter chart's place aggregate; empty without one.
    pub sub: AggregateSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub pointer: FilterPointer,
    pub title: String,
    pub charts: Vec<ChartView>,
    pub map: MapView,
    pub legend: Legend,
    pub primary_filters: Option<String>,
    pub sub_filters: Option<String>,
}

impl DashboardView {
    pub fn chart(&self, name: &str) -> Option<&ChartView> {
        self.charts.iter().find(|c| c.name == name)
    }

    pub fn region(&self, place: &str) -> Option<&Region> {
        self.map.regions.iter().find(|r| r.place == place)
    }

    /// Hover text for a region whose display name is `label`.
    pub fn region_info(&self, place: &str, label: &str) -> String {
        let current = match self.map.current.get(place) {
            Some(v) => v.to_string(),
            None => "N/A".to_string(),
        };
        match (&self.primary_filters, &self.sub_filters) {
            (None, _) => label.to_string(),
            (Some(_), None) => format!("{label}: {current}"),
            (Some(filters), Some(sub_filters)) => {
                let result = match self.map.current.get(place) {
                    Some(v) => format!("{v:.2}"),
                    None => "N/A".to_string(),
                };
                format!(
                    "{label}\n{filters}: {}\n{sub_filters}: {}\nResult : {result}",
                    self.map.primary.get(place).unwrap_or(0.0),
                    self.map.sub.get(place).unwrap_or(0.0),
                )
            }
        }
    }

    pub fn render(&self, renderer: &mut impl Renderer) {
        renderer.title(&self.title);
        for chart in &self.charts {
            renderer.chart(chart);
        }
        renderer.map(&self.map);
        renderer.legend(&self.legend);
    }
}

/// Draws a refreshed view. Implementations own geometry and output.
pub trait Renderer {
    fn title(&mut self, title: &str);
    fn chart(&mut self, chart: &ChartView);
    fn map(&mut self, map: &MapView);
    fn legend(&mut self, legend: &Legend);
}

impl<S: DimensionalStore> DashboardState<S> {
    /// Re-read every aggregate and build a fresh view.
    pub fn refresh(&self) -> Result<DashboardView, DashboardError> {
        let pointer = self.pointer();
        let charts = self.charts().iter().map(|c| self.chart_view(c)).collect();

        let (current, primary, sub) = self.map_series(pointer)?;
        let ramp = self.map_ramp(pointer)?;
        let max = current.max();
        trace!("Refreshing map: {} regions, max {}", current.len(), max);

        let selection = self.map().selection();
        let regions = current
            .iter()
            .map(|(place, value)| {
                let t = tier(value, max);
                let selected = selection.contains(place);
                let fill = if selection.is_empty() || selected {
                    ramp.color(t).to_string()
                } else {
                    UNSELECTED_REGION.to_string()
                };
                Region {
                    place: place.to_string(),
                    value,
                    tier: t,
                    fill,
                    selected,
                }
            })
            .collect();

        let primary_filters = pointer
            .primary()
            .map(|id| self.chart_or_err(id).map(|c| c.print_filters()))
            .transpose()?;
        let sub_filters = pointer
            .sub()
            .map(|id| self.chart_or_err(id).map(|c| c.print_filters()))
            .transpose()?;

        Ok(DashboardView {
            pointer,
            title: self.title(pointer)?,
            charts,
            legend: Legend::new(ramp, max),
            map: MapView {
                regions,
                max,
                current,
                primary,
                sub,
            },
            primary_filters,
            sub_filters,
        })
    }

    /// Refresh and hand the result to `renderer`.
    pub fn update_all(&self, renderer: &mut impl Renderer) -> Result<DashboardView, DashboardError> {
        let view = self.refresh()?;
        view.render(renderer);
        Ok(view)
    }

    /// `(current, primary, sub)` place series for `pointer`.
    pub fn map_series(
        &self,
        pointer: FilterPointer,
    ) -> Result<(AggregateSeries, AggregateSeries, AggregateSeries), DashboardError> {
        match pointer {
            FilterPointer::Unfiltered => {
                let total = self
                    .charts()
                    .iter()
                    .fold(AggregateSeries::new(), |acc, c| union_sum(&acc, &c.places()));
                Ok((total.clone(), total, AggregateSeries::new()))
            }
            FilterPointer::PrimaryOnly(p) => {
                let places = self.chart_or_err(p)?.places();
                Ok((places.clone(), places, AggregateSeries::new()))
            }
            FilterPointer::PrimaryAndSub(p, s) => {
                let op = self.relations().lookup_operation(s, p)?;
                let primary = self.chart_or_err(p)?.places();
                let sub = self.chart_or_err(s)?.places();
                Ok((combine(op, &primary, &sub), primary, sub))
            }
        }
    }

    fn map_ramp(&self, pointer: FilterPointer) -> Result<&ColorRamp, DashboardError> {
        Ok(match pointer {
            FilterPointer::Unfiltered => self.map().colors(),
            FilterPointer::PrimaryOnly(p) => self.chart_or_err(p)?.ramp(),
            FilterPointer::PrimaryAndSub(..) => self.map().merge_colors(),
        })
    }

    fn title(&self, pointer: FilterPointer) -> Result<String, DashboardError> {
        Ok(match pointer {
            FilterPointer::Unfiltered => "Map of general activity".to_string(),
            FilterPointer::PrimaryOnly(p) => {
                format!("Map of {}", self.chart_or_err(p)?.print_filters())
            }
            FilterPointer::PrimaryAndSub(p, s) => {
                let op = self.relations().lookup_operation(s, p)?;
                format!(
                    "Map of ({}) {} ({})",
                    self.chart_or_err(p)?.print_filters(),
                    op,
                    self.chart_or_err(s)?.print_filters()
                )
            }
        })
    }

    fn chart_view(&self, chart: &Chart<S>) -> ChartView {
        let config = chart.config();
        let categories = chart.categories();
        let primary = self.pointer().primary();

        let idle_fill = match primary {
            None => config.bar_color.as_str(),
            Some(p) if self.relations().is_child_of(chart.id(), p) => chart.ramp().color(1),
            Some(_) => INACTIVE_BAR,
        };

        let bars = categories
            .iter()
            .map(|(key, value)| {
                let selected = chart.selection().contains(key);
                let fill = if !chart.has_active_selection() {
                    idle_fill
                } else if selected {
                    config.bar_color.as_str()
                } else {
                    INACTIVE_BAR
                };
                Bar {
                    key: key.to_string(),
                    value,
                    fill: fill.to_string(),
                    selected,
                }
            })
            .collect();

        let axis_max = if config.elastic_axis {
            categories.max()
        } else {
            chart.initial_max()
        };

        ChartView {
            id: chart.id(),
            name: chart.name().to_string(),
            width: config.width,
            height: config.height,
            axis_max,
            bars,
        }
    }

    fn chart_or_err(&self, id: ChartId) -> Result<&Chart<S>, DashboardError> {
        self.chart(id)
            .ok_or_else(|| DashboardError::UnknownChart(id.to_string()))
    }
}
