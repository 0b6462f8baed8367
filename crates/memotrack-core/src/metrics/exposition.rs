//! Prometheus text exposition (format 0.0.4).

use std::fmt::Write;

use crate::metrics::descriptor::MetricDescriptor;
use crate::metrics::instruments::{Sample, SampleValue};

/// Content type served by the scrape endpoint.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Render a float the way scrapers expect (`+Inf`, `-Inf`, `NaN`, shortest decimal otherwise).
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        v.to_string()
    }
}

fn label_str(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn write_line(out: &mut String, name: &str, labels: &str, value: &str) {
    if labels.is_empty() {
        let _ = writeln!(out, "{} {}", name, value);
    } else {
        let _ = writeln!(out, "{}{{{}}} {}", name, labels, value);
    }
}

/// Write the `# HELP` / `# TYPE` header for one metric.
pub(crate) fn write_header(out: &mut String, desc: &MetricDescriptor) {
    let _ = writeln!(out, "# HELP {} {}", desc.name(), escape_help(desc.help()));
    let _ = writeln!(out, "# TYPE {} {}", desc.name(), desc.kind().as_str());
}

/// Write the value line(s) for one series.
pub(crate) fn write_sample(out: &mut String, sample: &Sample) {
    let name = sample.descriptor.name();
    let labels = label_str(&sample.labels);
    match &sample.value {
        SampleValue::Counter(v) | SampleValue::Gauge(v) => {
            write_line(out, name, &labels, &format_value(*v));
        }
        SampleValue::Histogram(h) => {
            let bucket_name = format!("{name}_bucket");
            for (le, count) in &h.buckets {
                let mut with_le = format!("le=\"{}\"", format_value(*le));
                if !labels.is_empty() {
                    with_le.push(',');
                    with_le.push_str(&labels);
                }
                write_line(out, &bucket_name, &with_le, &count.to_string());
            }
            write_line(out, &format!("{name}_sum"), &labels, &format_value(h.sum));
            write_line(out, &format!("{name}_count"), &labels, &h.count.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_special_values() {
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(4.0), "4");
        assert_eq!(format_value(30.5), "30.5");
        assert_eq!(format_value(0.005), "0.005");
    }

    #[test]
    fn escapes_label_values_and_help() {
        assert_eq!(escape_label("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
        assert_eq!(escape_help("line1\nline\\2"), "line1\\nline\\\\2");
    }
}
