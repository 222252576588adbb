//! Stamp interpolation for calligraphy strokes

use super::BrushSettings;
use crate::config::RasterConfig;
use crate::input::Point;
use crate::raster::Rect;

/// One placement of the nib along a stroke
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stamp {
    pub x: f32,
    pub y: f32,
    /// Dynamic size (nib width) at this stamp
    pub size: f32,
}

/// Parameter range `[t0, t1]` of segment `a -> b` that lies inside `clip`
fn clip_segment(a: &Point, b: &Point, clip: &Rect) -> Option<(f32, f32)> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let (mut t0, mut t1) = (0.0_f32, 1.0_f32);
    let edges = [
        (-dx, a.x - clip.x),
        (dx, clip.x + clip.width - a.x),
        (-dy, a.y - clip.y),
        (dy, clip.y + clip.height - a.y),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some((t0, t1))
}

/// Nib placements for a calligraphy stroke, in drawing order.
///
/// Every input point gets a stamp. Between consecutive points, synthetic
/// stamps fill the gap whenever the distance exceeds the spacing threshold,
/// which is a fraction of the size at the later point (with an absolute
/// floor). Position and pressure are interpolated linearly and the size is
/// recomputed from the interpolated pressure.
///
/// With `clip`, synthetic stamps are only generated where the segment passes
/// within a nib's reach of the rectangle, so far off-surface coordinates cost
/// no more than the visible part of the stroke. Stamp positions inside the
/// clip are the same as without it.
pub fn calligraphy_stamps(
    points: &[Point],
    settings: &BrushSettings,
    config: &RasterConfig,
    clip: Option<&Rect>,
) -> Vec<Stamp> {
    let mut stamps = Vec::with_capacity(points.len() * 4);

    for (i, p) in points.iter().enumerate() {
        let size = settings.dynamic_size(p.pressure);
        stamps.push(Stamp {
            x: p.x,
            y: p.y,
            size,
        });

        if i == 0 {
            continue;
        }
        let prev = &points[i - 1];
        let spacing = (size * config.stamp_spacing_ratio).max(config.min_stamp_spacing);
        let steps = (prev.distance_to(p) as f64 / spacing as f64).ceil();
        if !steps.is_finite() || steps < 2.0 {
            continue;
        }

        let (t0, t1) = match clip {
            Some(clip) => {
                // Size is linear in pressure, so the endpoints bound the nib
                let reach = size.max(settings.dynamic_size(prev.pressure)) / 2.0
                    + config.min_stamp_half_height
                    + 1.0;
                let expanded = Rect::new(
                    clip.x - reach,
                    clip.y - reach,
                    clip.width + 2.0 * reach,
                    clip.height + 2.0 * reach,
                );
                match clip_segment(prev, p, &expanded) {
                    Some(range) => range,
                    None => continue,
                }
            }
            None => (0.0, 1.0),
        };
        let first = (t0 as f64 * steps).ceil().max(1.0) as u64;
        let last = (t1 as f64 * steps).floor().min(steps - 1.0) as u64;
        let steps = steps as u64;

        for s in first..=last {
            let t = s as f32 / steps as f32;
            let ip = prev.lerp(p, t);
            stamps.push(Stamp {
                x: ip.x,
                y: ip.y,
                size: settings.dynamic_size(ip.pressure),
            });
        }
    }

    stamps
}
