use crate::color::Legend;
use crate::measure::ChartMetrics;
use crate::view::{ChartView, MapView, Renderer};
use std::fmt::Write;

pub struct SvgRenderer {
    metrics: ChartMetrics,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            metrics: ChartMetrics::default(),
        }
    }
}

impl SvgRenderer {
    /// Horizontal row chart: one band per category, label on the left,
    /// value after the bar.
    pub fn render_chart(&self, chart: &ChartView) -> String {
        let m = &self.metrics;
        let mut svg = String::new();

        writeln!(
            &mut svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            chart.width, chart.height, chart.width, chart.height
        )
        .unwrap();

        writeln!(
            &mut svg,
            r#"<style>
  .dashgraph-bar {{ cursor: pointer; }}
  .textlabel {{ font-family: sans-serif; font-size: 0.8em; fill: black; cursor: pointer; }}
  .textvalue {{ font-family: sans-serif; font-size: 0.8em; fill: black; }}
</style>"#
        )
        .unwrap();

        writeln!(
            &mut svg,
            r#"<g transform="translate({},{})">"#,
            m.margin_left, m.margin_top
        )
        .unwrap();

        let band = m.band(chart.height, chart.bars.len());
        for (i, bar) in chart.bars.iter().enumerate() {
            let y = band * i as f64;
            let length = m.bar_length(bar.value, chart.axis_max, chart.width);

            // 1. Bar
            writeln!(
                &mut svg,
                r#"<rect class="dashgraph-bar" data-key="{}" x="0" y="{}" width="{}" height="{}" fill="{}" />"#,
                escape_xml(&bar.key),
                y,
                length,
                (band - 1.0).max(0.0),
                escape_xml(&bar.fill)
            )
            .unwrap();

            // 2. Category label, cut to fit the left margin
            writeln!(
                &mut svg,
                r#"<text class="textlabel" data-key="{}" x="{}" y="{}">{}</text>"#,
                escape_xml(&bar.key),
                5.0 - m.margin_left,
                y + m.text_shift,
                escape_xml(&m.label(&bar.key))
            )
            .unwrap();

            // 3. Value
            writeln!(
                &mut svg,
                r#"<text class="textvalue" x="{}" y="{}">{}</text>"#,
                length + m.value_gap,
                y + m.text_shift,
                bar.value
            )
            .unwrap();
        }

        writeln!(&mut svg, "</g>").unwrap();
        writeln!(&mut svg, "</svg>").unwrap();
        svg
    }

    /// Five swatches with their value ranges, stacked top to bottom.
    pub fn render_legend(&self, legend: &Legend) -> String {
        let row = self.metrics.text_shift;
        let width = legend
            .entries
            .iter()
            .map(|e| self.metrics.text_width(&e.label))
            .fold(0.0, f64::max)
            + row * 2.0;
        let height = row * legend.entries.len() as f64;

        let mut svg = String::new();
        writeln!(
            &mut svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            width, height, width, height
        )
        .unwrap();

        for (i, entry) in legend.entries.iter().enumerate() {
            let y = row * i as f64;
            writeln!(
                &mut svg,
                r#"<rect class="ldlegendbox" x="0" y="{}" width="{}" height="{}" fill="{}" />"#,
                y,
                row - 4.0,
                row - 4.0,
                escape_xml(&entry.color)
            )
            .unwrap();
            writeln!(
                &mut svg,
                r#"<text class="ldlegendtext" x="{}" y="{}">{}</text>"#,
                row,
                y + row - 6.0,
                escape_xml(&entry.label)
            )
            .unwrap();
        }

        writeln!(&mut svg, "</svg>").unwrap();
        svg
    }
}

/// Collects one refresh worth of output: SVG for charts and legend, and
/// region fills for the host's map layer.
#[derive(Debug, Clone, Default)]
pub struct SvgFrame {
    pub title: String,
    pub charts: Vec<(String, String)>,
    pub region_fills: Vec<(String, String)>,
    pub legend: String,
}

impl SvgFrame {
    pub fn chart(&self, name: &str) -> Option<&str> {
        self.charts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, svg)| svg.as_str())
    }
}

/// Renders into an [`SvgFrame`].
pub struct SvgFrameRenderer {
    svg: SvgRenderer,
    pub frame: SvgFrame,
}

impl Default for SvgFrameRenderer {
    fn default() -> Self {
        Self {
            svg: SvgRenderer::default(),
            frame: SvgFrame::default(),
        }
    }
}

impl Renderer for SvgFrameRenderer {
    fn title(&mut self, title: &str) {
        self.frame.title = title.to_string();
    }

    fn chart(&mut self, chart: &ChartView) {
        let svg = self.svg.render_chart(chart);
        self.frame.charts.push((chart.name.clone(), svg));
    }

    fn map(&mut self, map: &MapView) {
        self.frame.region_fills = map
            .regions
            .iter()
            .map(|r| (r.place.clone(), r.fill.clone()))
            .collect();
    }

    fn legend(&mut self, legend: &Legend) {
        self.frame.legend = self.svg.render_legend(legend);
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
