//! Line charts of training progress, expressed as ECharts options.
//!
//! The browser owns the drawing; this side keeps the pushed logs and produces
//! the JSON handed to `chart.setOption`.

use serde_json::{json, Value};

use crate::train::{BatchLog, EpochLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Batch,
    Epoch,
}

impl ChartKind {
    pub fn title(self) -> &'static str {
        match self {
            ChartKind::Batch => "Batch Log",
            ChartKind::Epoch => "Epoch Log",
        }
    }

    /// Series names, in legend order.
    pub fn legend(self) -> &'static [&'static str] {
        match self {
            ChartKind::Batch => &["loss", "acc"],
            ChartKind::Epoch => &["loss", "acc", "val_acc", "val_loss"],
        }
    }
}

/// A log the chart can plot: one value per series name, `None` for a gap.
pub trait ChartPoint {
    fn value(&self, series: &str) -> Option<f64>;
}

impl ChartPoint for BatchLog {
    fn value(&self, series: &str) -> Option<f64> {
        match series {
            "loss" => Some(self.loss),
            "acc" => Some(self.acc),
            _ => None,
        }
    }
}

impl ChartPoint for EpochLog {
    fn value(&self, series: &str) -> Option<f64> {
        match series {
            "loss" => Some(self.loss),
            "acc" => Some(self.acc),
            "val_acc" => self.val_acc,
            "val_loss" => self.val_loss,
            _ => None,
        }
    }
}

/// Every point pushed so far, one column per legend entry.
#[derive(Debug, Clone)]
pub struct ChartLog {
    kind: ChartKind,
    columns: Vec<Vec<Option<f64>>>,
    len: usize,
}

impl ChartLog {
    pub fn new(kind: ChartKind) -> Self {
        ChartLog {
            kind,
            columns: vec![Vec::new(); kind.legend().len()],
            len: 0,
        }
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.columns.iter_mut().for_each(Vec::clear);
        self.len = 0;
    }

    /// Full option for a freshly created chart: empty axes and series.
    pub fn init_option(&self) -> Value {
        let legend = self.kind.legend();
        let series: Vec<Value> = legend
            .iter()
            .map(|name| json!({ "name": name, "type": "line", "stack": name, "data": [] }))
            .collect();

        json!({
            "title": { "text": self.kind.title() },
            "tooltip": { "trigger": "axis" },
            "legend": { "data": legend },
            "grid": { "left": "3%", "right": "4%", "bottom": "3%", "containLabel": true },
            "toolbox": { "feature": { "saveAsImage": {} } },
            "xAxis": { "type": "category", "boundaryGap": false, "data": [] },
            "yAxis": { "type": "value" },
            "series": series,
        })
    }

    /// Records `log` and returns the option that brings a chart up to date.
    pub fn update(&mut self, log: &impl ChartPoint) -> Value {
        self.push(log);
        self.data_option()
    }

    /// Records `log` and returns just the new point:
    /// `{"index": i, "values": [..]}` with values in legend order.
    ///
    /// Its size does not grow with the log, so it suits streaming to a chart
    /// that already holds the earlier points.
    pub fn push(&mut self, log: &impl ChartPoint) -> Value {
        let values: Vec<Option<f64>> = self.kind.legend().iter().map(|name| log.value(name)).collect();
        for (column, value) in self.columns.iter_mut().zip(&values) {
            column.push(*value);
        }
        self.len += 1;
        json!({ "index": self.len - 1, "values": values })
    }

    /// x axis `0..len` and every series column.
    pub fn data_option(&self) -> Value {
        let series: Vec<Value> = self
            .kind
            .legend()
            .iter()
            .zip(&self.columns)
            .map(|(name, column)| json!({ "name": name, "data": column }))
            .collect();

        json!({
            "xAxis": { "data": (0..self.len).collect::<Vec<_>>() },
            "series": series,
        })
    }

    /// `init_option` with the recorded data filled in; used to redraw a chart
    /// from scratch.
    pub fn snapshot(&self) -> Value {
        let mut option = self.init_option();
        let data = self.data_option();
        option["xAxis"]["data"] = data["xAxis"]["data"].clone();
        if let (Some(series), Some(columns)) = (option["series"].as_array_mut(), data["series"].as_array()) {
            for (entry, column) in series.iter_mut().zip(columns) {
                entry["data"] = column["data"].clone();
            }
        }
        option
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch(n: usize, val_acc: Option<f64>) -> EpochLog {
        EpochLog {
            epoch: n,
            total_epochs: 3,
            loss: 1.0 / n as f64,
            acc: 0.5,
            val_loss: Some(0.9),
            val_acc,
            elapsed_ms: 10,
        }
    }

    #[test]
    fn init_option_has_title_legend_and_empty_series() {
        let chart = ChartLog::new(ChartKind::Epoch);
        let option = chart.init_option();
        assert_eq!(option["title"]["text"], "Epoch Log");
        assert_eq!(option["tooltip"]["trigger"], "axis");
        assert_eq!(option["legend"]["data"], json!(["loss", "acc", "val_acc", "val_loss"]));
        assert_eq!(option["xAxis"]["type"], "category");
        assert_eq!(option["xAxis"]["boundaryGap"], false);
        let series = option["series"].as_array().unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series[2]["name"], "val_acc");
        assert_eq!(series[2]["stack"], "val_acc");
        assert!(series[2]["data"].as_array().unwrap().is_empty());
    }

    #[test]
    fn update_returns_axis_and_columns() {
        let mut chart = ChartLog::new(ChartKind::Batch);
        chart.update(&BatchLog { epoch: 1, batch: 0, loss: 2.0, acc: 0.1 });
        let option = chart.update(&BatchLog { epoch: 1, batch: 10, loss: 1.5, acc: 0.3 });

        assert_eq!(chart.len(), 2);
        assert_eq!(option["xAxis"]["data"], json!([0, 1]));
        assert_eq!(option["series"][0]["name"], "loss");
        assert_eq!(option["series"][0]["data"], json!([2.0, 1.5]));
        assert_eq!(option["series"][1]["data"], json!([0.1, 0.3]));
    }

    #[test]
    fn push_returns_only_the_new_point() {
        let mut chart = ChartLog::new(ChartKind::Epoch);
        let first = chart.push(&epoch(1, Some(0.4)));
        assert_eq!(first, json!({ "index": 0, "values": [1.0, 0.5, 0.4, 0.9] }));

        for n in 2..200 {
            chart.push(&epoch(n, None));
        }
        let last = chart.push(&epoch(200, Some(0.7)));
        assert_eq!(last["index"], 199);
        assert_eq!(last["values"].as_array().unwrap().len(), 4);
        assert_eq!(chart.len(), 200);
        assert_eq!(chart.data_option()["series"][2]["data"][199], 0.7);
    }

    #[test]
    fn missing_values_become_null() {
        let mut chart = ChartLog::new(ChartKind::Epoch);
        let option = chart.update(&epoch(1, None));
        assert!(option["series"][2]["data"][0].is_null());
        assert_eq!(option["series"][3]["data"][0], 0.9);
    }

    #[test]
    fn snapshot_and_clear() {
        let mut chart = ChartLog::new(ChartKind::Epoch);
        chart.update(&epoch(1, Some(0.4)));
        chart.update(&epoch(2, Some(0.6)));

        let snapshot = chart.snapshot();
        assert_eq!(snapshot["title"]["text"], "Epoch Log");
        assert_eq!(snapshot["xAxis"]["data"], json!([0, 1]));
        assert_eq!(snapshot["series"][2]["data"], json!([0.4, 0.6]));
        assert_eq!(snapshot["series"][2]["type"], "line");

        chart.clear();
        assert!(chart.is_empty());
        assert_eq!(chart.data_option()["xAxis"]["data"], json!([]));
    }
}
