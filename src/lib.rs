pub mod color;
pub mod combine;
pub mod config;
pub mod measure;
pub mod relation;
pub mod series;
pub mod state;
pub mod store;
pub mod svg;
pub mod view;

use wasm_bindgen::prelude::*;

use config::DashboardConfig;
use state::{ClickOutcome, DashboardState};
use svg::SvgRenderer;
use view::DashboardView;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Browser handle on one dashboard. Click handlers return the refreshed
/// view, or `null` when the click was ignored.
#[wasm_bindgen]
pub struct Dashboard {
    state: DashboardState,
    view: DashboardView,
    svg: SvgRenderer,
}

#[wasm_bindgen]
impl Dashboard {
    #[wasm_bindgen(js_name = "fromJson")]
    pub fn from_json(json: &str) -> Result<Dashboard, JsValue> {
        let config = DashboardConfig::from_json(json).map_err(to_js_error)?;
        let state = DashboardState::from_config(&config).map_err(to_js_error)?;
        let view = state.refresh().map_err(to_js_error)?;
        Ok(Dashboard {
            state,
            view,
            svg: SvgRenderer::default(),
        })
    }

    #[wasm_bindgen(js_name = "chartNames")]
    pub fn chart_names(&self) -> js_sys::Array {
        self.state
            .charts()
            .iter()
            .map(|c| JsValue::from_str(c.name()))
            .collect()
    }

    #[wasm_bindgen(js_name = "clickChart")]
    pub fn click_chart(&mut self, chart: &str, key: &str) -> Result<JsValue, JsValue> {
        let id = self
            .state
            .chart_id(chart)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown chart: {chart}")))?;
        let outcome = self.state.click_chart(id, key).map_err(to_js_error)?;
        self.apply(outcome)
    }

    #[wasm_bindgen(js_name = "clickMap")]
    pub fn click_map(&mut self, place: &str) -> Result<JsValue, JsValue> {
        let outcome = self.state.click_map(place).map_err(to_js_error)?;
        self.apply(outcome)
    }

    /// The current view as a plain JS object.
    #[wasm_bindgen(js_name = "view")]
    pub fn view(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.view).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = "title")]
    pub fn title(&self) -> String {
        self.view.title.clone()
    }

    #[wasm_bindgen(js_name = "chartSvg")]
    pub fn chart_svg(&self, chart: &str) -> Option<String> {
        self.view.chart(chart).map(|c| self.svg.render_chart(c))
    }

    #[wasm_bindgen(js_name = "legendSvg")]
    pub fn legend_svg(&self) -> String {
        self.svg.render_legend(&self.view.legend)
    }

    #[wasm_bindgen(js_name = "regionFill")]
    pub fn region_fill(&self, place: &str) -> Option<String> {
        self.view.region(place).map(|r| r.fill.clone())
    }

    /// Hover text; `None` when the map has no info attribute.
    #[wasm_bindgen(js_name = "regionInfo")]
    pub fn region_info(&self, place: &str, label: &str) -> Option<String> {
        self.state.map().config().info_attr.as_ref()?;
        Some(self.view.region_info(place, label))
    }

    #[wasm_bindgen(js_name = "hasValue")]
    pub fn has_value(&self, place: &str) -> bool {
        self.state.map().has_value(place)
    }
}

impl Dashboard {
    fn apply(&mut self, outcome: ClickOutcome) -> Result<JsValue, JsValue> {
        match outcome {
            ClickOutcome::Ignored => Ok(JsValue::NULL),
            ClickOutcome::Refreshed(view) => {
                self.view = view;
                self.view()
            }
        }
    }
}

/// Render every chart of a dashboard config to SVG, keyed by chart name.
#[wasm_bindgen(js_name = "dashboardToSvg")]
pub fn render_dashboard(json: &str) -> Result<JsValue, JsValue> {
    let state = DashboardState::from_json(json).map_err(to_js_error)?;
    let mut renderer = svg::SvgFrameRenderer::default();
    state.update_all(&mut renderer).map_err(to_js_error)?;
    let charts: std::collections::BTreeMap<String, String> =
        renderer.frame.charts.into_iter().collect();
    serde_wasm_bindgen::to_value(&charts).map_err(to_js_error)
}
