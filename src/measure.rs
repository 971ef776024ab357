use unicode_width::UnicodeWidthStr;

pub struct ChartMetrics {
    pub char_width: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub text_shift: f64,
    pub value_gap: f64,
    /// Labels wider than this many columns are cut.
    pub label_max_columns: usize,
    /// Columns kept before the ellipsis.
    pub label_keep_columns: usize,
}

impl Default for ChartMetrics {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            margin_top: 20.0,
            margin_right: 50.0,
            margin_bottom: 20.0,
            margin_left: 75.0,
            text_shift: 20.0,
            value_gap: 5.0,
            label_max_columns: 12,
            label_keep_columns: 10,
        }
    }
}

impl ChartMetrics {
    pub fn text_width(&self, text: &str) -> f64 {
        let width = UnicodeWidthStr::width(text);
        width as f64 * self.char_width
    }

    pub fn plot_width(&self, width: f64) -> f64 {
        (width - self.margin_left - self.margin_right).max(0.0)
    }

    pub fn plot_height(&self, height: f64) -> f64 {
        (height - self.margin_top - self.margin_bottom).max(0.0)
    }

    /// Height of one row band when `rows` bars share the plot.
    pub fn band(&self, height: f64, rows: usize) -> f64 {
        if rows == 0 {
            0.0
        } else {
            self.plot_height(height) / rows as f64
        }
    }

    /// Linear x scale over `[0, max]`.
    pub fn bar_length(&self, value: f64, max: f64, width: f64) -> f64 {
        if !(max > 0.0) || !(value > 0.0) {
            return 0.0;
        }
        value / max * self.plot_width(width)
    }

    /// Cut long category labels by display width, not bytes.
    pub fn label(&self, key: &str) -> String {
        if UnicodeWidthStr::width(key) <= self.label_max_columns {
            return key.to_string();
        }
        let mut out = String::new();
        let mut columns = 0;
        for c in key.chars() {
            let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
            if columns + w > self.label_keep_columns {
                break;
            }
            columns += w;
            out.push(c);
        }
        out.push_str("...");
        out
    }
}
