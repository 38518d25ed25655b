//! Plot-ready geometry for a banded time-series chart.
//!
//! The output is pure data: a path, point markers, background zone
//! rectangles and y-axis ticks in canvas coordinates. Drawing it is up to
//! whatever surface consumes the geometry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::band::{Band, Zone};
use crate::format::format_numeric;
use crate::window::Timestamped;

/// Fewer valid points than this yields no chart at all.
pub const MIN_CHART_POINTS: usize = 2;
pub const TICK_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Padding {
    pub const fn uniform(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    pub padding: Padding,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 720.0,
            height: 280.0,
            padding: Padding {
                top: 18.0,
                right: 20.0,
                bottom: 58.0,
                left: 52.0,
            },
        }
    }
}

/// How far the value domain extends past the band so every zone is visible.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DomainMargins {
    /// Subtracted from `target_min`.
    pub below: f64,
    /// Added to `elevated_max`.
    pub above: f64,
}

impl Default for DomainMargins {
    fn default() -> Self {
        Self {
            below: 10.0,
            above: 20.0,
        }
    }
}

/// One input sample. Only finite, dated points are plotted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    pub value: f64,
    pub recorded_at: Option<DateTime<Utc>>,
    pub label: String,
}

impl ChartPoint {
    pub fn is_plottable(&self) -> bool {
        self.value.is_finite() && self.recorded_at.is_some()
    }
}

impl Timestamped for ChartPoint {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.recorded_at
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlotArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PathCommand {
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlottedPoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
    pub label: String,
    pub zone: Zone,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ZoneRect {
    pub zone: Zone,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AxisTick {
    pub value: i64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartGeometry {
    pub chart_min: f64,
    pub chart_max: f64,
    pub plot: PlotArea,
    pub path: Vec<PathCommand>,
    pub points: Vec<PlottedPoint>,
    pub zones: Vec<ZoneRect>,
    pub y_ticks: Vec<AxisTick>,
    canvas_height: f64,
    padding_bottom: f64,
}

impl ChartGeometry {
    fn range(&self) -> f64 {
        (self.chart_max - self.chart_min).max(1.0)
    }

    /// Vertical position of a value; larger values sit higher (smaller y).
    pub fn value_to_y(&self, value: f64) -> f64 {
        let normalized = (value - self.chart_min) / self.range();
        self.canvas_height - self.padding_bottom - normalized * self.plot.height
    }

    /// The path as an SVG `d` attribute.
    pub fn svg_path(&self) -> String {
        self.path
            .iter()
            .map(|command| match command {
                PathCommand::MoveTo { x, y } => {
                    format!("M {} {}", format_numeric(*x), format_numeric(*y))
                }
                PathCommand::LineTo { x, y } => {
                    format!("L {} {}", format_numeric(*x), format_numeric(*y))
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Build chart geometry with the default domain margins.
///
/// Returns `None` when fewer than two points are plottable; callers render
/// that as an explicit "not enough data" state.
pub fn build_chart(points: &[ChartPoint], band: &Band, canvas: &Canvas) -> Option<ChartGeometry> {
    build_chart_with_margins(points, band, canvas, DomainMargins::default())
}

pub fn build_chart_with_margins(
    points: &[ChartPoint],
    band: &Band,
    canvas: &Canvas,
    margins: DomainMargins,
) -> Option<ChartGeometry> {
    let plottable: Vec<(&ChartPoint, Zone)> = points
        .iter()
        .filter(|p| p.is_plottable())
        .filter_map(|p| band.zone(p.value).map(|zone| (p, zone)))
        .collect();
    if plottable.len() < MIN_CHART_POINTS {
        tracing::debug!(
            plottable = plottable.len(),
            total = points.len(),
            "not enough points for a chart"
        );
        return None;
    }

    let observed_min = plottable.iter().map(|(p, _)| p.value).fold(f64::INFINITY, f64::min);
    let observed_max = plottable
        .iter()
        .map(|(p, _)| p.value)
        .fold(f64::NEG_INFINITY, f64::max);
    let chart_min = observed_min.min(band.target_min - margins.below);
    let chart_max = observed_max.max(band.elevated_max + margins.above);
    if !(chart_max - chart_min).is_finite() {
        tracing::warn!(chart_min, chart_max, "value domain overflows, no chart");
        return None;
    }

    let padding = canvas.padding;
    let plot = PlotArea {
        x: padding.left,
        y: padding.top,
        width: (canvas.width - padding.left - padding.right).max(0.0),
        height: (canvas.height - padding.top - padding.bottom).max(0.0),
    };

    let mut geometry = ChartGeometry {
        chart_min,
        chart_max,
        plot,
        path: Vec::with_capacity(plottable.len()),
        points: Vec::with_capacity(plottable.len()),
        zones: Vec::new(),
        y_ticks: Vec::with_capacity(TICK_COUNT),
        canvas_height: canvas.height,
        padding_bottom: padding.bottom,
    };

    let x_step = plot.width / (plottable.len() - 1) as f64;
    for (idx, (point, zone)) in plottable.iter().enumerate() {
        let x = plot.x + idx as f64 * x_step;
        let y = geometry.value_to_y(point.value);
        geometry.path.push(if idx == 0 {
            PathCommand::MoveTo { x, y }
        } else {
            PathCommand::LineTo { x, y }
        });
        geometry.points.push(PlottedPoint {
            x,
            y,
            value: point.value,
            label: point.label.clone(),
            zone: *zone,
        });
    }

    geometry.zones = vec![
        zone_rect(&geometry, Zone::Target, band.target_min, band.target_max),
        zone_rect(&geometry, Zone::Elevated, band.target_max, band.elevated_max),
        zone_rect(&geometry, Zone::High, band.elevated_max, chart_max),
    ];

    let range = geometry.range();
    geometry.y_ticks = (0..TICK_COUNT)
        .map(|idx| {
            let value = (chart_min + range * (idx as f64 / (TICK_COUNT - 1) as f64)).round();
            AxisTick {
                value: value as i64,
                y: geometry.value_to_y(value),
            }
        })
        .collect();

    Some(geometry)
}

fn zone_rect(geometry: &ChartGeometry, zone: Zone, lower: f64, upper: f64) -> ZoneRect {
    let clamp = |value: f64| value.clamp(geometry.chart_min, geometry.chart_max);
    let top = geometry.value_to_y(clamp(upper));
    let bottom = geometry.value_to_y(clamp(lower));
    ZoneRect {
        zone,
        x: geometry.plot.x,
        y: top,
        width: geometry.plot.width,
        height: (bottom - top).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const BAND: Band = Band::new(70.0, 180.0, 240.0);

    fn point(value: f64, day: u32) -> ChartPoint {
        ChartPoint {
            value,
            recorded_at: Some(Utc.with_ymd_and_hms(2024, 1, day, 8, 0, 0).unwrap()),
            label: format!("{day:02}/01"),
        }
    }

    fn square_canvas() -> Canvas {
        Canvas {
            width: 220.0,
            height: 220.0,
            padding: Padding::uniform(10.0),
        }
    }

    #[test]
    fn fewer_than_two_plottable_points_is_insufficient() {
        assert!(build_chart(&[], &BAND, &Canvas::default()).is_none());
        assert!(build_chart(&[point(100.0, 1)], &BAND, &Canvas::default()).is_none());

        let mut undated = point(120.0, 2);
        undated.recorded_at = None;
        let nan = point(f64::NAN, 3);
        assert!(build_chart(&[point(100.0, 1), undated, nan], &BAND, &Canvas::default()).is_none());
    }

    #[test]
    fn two_points_produce_geometry() {
        let geometry = build_chart(&[point(100.0, 1), point(120.0, 2)], &BAND, &Canvas::default());
        assert!(geometry.is_some());
    }

    #[test]
    fn domain_is_extended_past_the_band() {
        let geometry =
            build_chart(&[point(100.0, 1), point(120.0, 2)], &BAND, &square_canvas()).unwrap();
        assert_eq!(geometry.chart_min, 60.0);
        assert_eq!(geometry.chart_max, 260.0);

        let wide =
            build_chart(&[point(40.0, 1), point(400.0, 2)], &BAND, &square_canvas()).unwrap();
        assert_eq!(wide.chart_min, 40.0);
        assert_eq!(wide.chart_max, 400.0);
    }

    #[test]
    fn values_map_to_inverted_vertical_axis() {
        let geometry =
            build_chart(&[point(60.0, 1), point(260.0, 2)], &BAND, &square_canvas()).unwrap();
        // domain 60..260 over a 200px plot starting at y=10
        assert_eq!(geometry.value_to_y(60.0), 210.0);
        assert_eq!(geometry.value_to_y(260.0), 10.0);
        assert_eq!(geometry.value_to_y(160.0), 110.0);
        assert_eq!(
            geometry.path,
            vec![
                PathCommand::MoveTo { x: 10.0, y: 210.0 },
                PathCommand::LineTo { x: 210.0, y: 10.0 },
            ]
        );
    }

    #[test]
    fn points_are_evenly_spaced() {
        let points = [point(100.0, 1), point(110.0, 2), point(120.0, 3), point(90.0, 4), point(95.0, 5)];
        let geometry = build_chart(&points, &BAND, &square_canvas()).unwrap();
        let xs: Vec<f64> = geometry.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![10.0, 60.0, 110.0, 160.0, 210.0]);
    }

    #[test]
    fn unplottable_points_are_skipped_not_spaced() {
        let mut undated = point(130.0, 2);
        undated.recorded_at = None;
        let geometry =
            build_chart(&[point(100.0, 1), undated, point(120.0, 3)], &BAND, &square_canvas())
                .unwrap();
        assert_eq!(geometry.points.len(), 2);
        assert_eq!(geometry.points[1].x, 210.0);
        assert_eq!(geometry.points[1].label, "03/01");
    }

    #[test]
    fn zones_cover_target_elevated_and_high() {
        let geometry =
            build_chart(&[point(60.0, 1), point(260.0, 2)], &BAND, &square_canvas()).unwrap();
        let zones: Vec<Zone> = geometry.zones.iter().map(|z| z.zone).collect();
        assert_eq!(zones, vec![Zone::Target, Zone::Elevated, Zone::High]);

        let target = geometry.zones[0];
        assert_eq!(target.y, geometry.value_to_y(180.0));
        assert_eq!(target.height, geometry.value_to_y(70.0) - geometry.value_to_y(180.0));
        assert_eq!(target.width, 200.0);

        let high = geometry.zones[2];
        assert_eq!(high.y, 10.0);
        assert_eq!(high.height, geometry.value_to_y(240.0) - 10.0);
    }

    #[test]
    fn five_rounded_ticks_span_the_domain() {
        let geometry =
            build_chart(&[point(100.0, 1), point(120.0, 2)], &BAND, &square_canvas()).unwrap();
        let values: Vec<i64> = geometry.y_ticks.iter().map(|t| t.value).collect();
        assert_eq!(values, vec![60, 110, 160, 210, 260]);
        assert_eq!(geometry.y_ticks[0].y, 210.0);
        assert_eq!(geometry.y_ticks[4].y, 10.0);

        let odd = build_chart(&[point(63.0, 1), point(120.0, 2)], &Band::new(73.0, 180.0, 240.0), &square_canvas())
            .unwrap();
        // domain 63..260, step 49.25
        let values: Vec<i64> = odd.y_ticks.iter().map(|t| t.value).collect();
        assert_eq!(values, vec![63, 112, 162, 211, 260]);
    }

    #[test]
    fn plotted_points_carry_their_zone() {
        let geometry = build_chart(
            &[point(65.0, 1), point(150.0, 2), point(200.0, 3), point(300.0, 4)],
            &BAND,
            &square_canvas(),
        )
        .unwrap();
        let zones: Vec<Zone> = geometry.points.iter().map(|p| p.zone).collect();
        assert_eq!(zones, vec![Zone::Low, Zone::Target, Zone::Elevated, Zone::High]);
    }

    #[test]
    fn svg_path_uses_move_then_line() {
        let geometry =
            build_chart(&[point(60.0, 1), point(260.0, 2)], &BAND, &square_canvas()).unwrap();
        assert_eq!(geometry.svg_path(), "M 10 210 L 210 10");
    }

    #[test]
    fn overflowing_domain_yields_no_chart() {
        let points = [point(-1e308, 1), point(1e308, 2)];
        assert!(build_chart(&points, &BAND, &Canvas::default()).is_none());

        let huge = [point(100.0, 1), point(f64::MAX, 2)];
        let geometry = build_chart(&huge, &BAND, &Canvas::default()).unwrap();
        assert!(geometry.points.iter().all(|p| p.y.is_finite()));
        assert!(geometry.y_ticks.iter().all(|t| t.y.is_finite()));
    }

    #[test]
    fn custom_margins_shift_the_domain() {
        let band = Band::new(4.0, 7.0, 9.0);
        let margins = DomainMargins { below: 0.0, above: 1.0 };
        let geometry =
            build_chart_with_margins(&[point(6.1, 1), point(7.4, 2)], &band, &square_canvas(), margins)
                .unwrap();
        assert_eq!(geometry.chart_min, 4.0);
        assert_eq!(geometry.chart_max, 10.0);
    }
}
