// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{ops::Range, path::Path};

use plotters::{prelude::*, style::RGBAColor};

use super::{Line, PlotError};
use crate::{segments::SegmentList, triggers::Trigger};

/// The number of X pixels on the plots.
const X_PIXELS: u32 = 1200;
/// The number of Y pixels on the plots.
const Y_PIXELS: u32 = 600;

/// Long series are decimated to about this many points before drawing.
const MAX_POINTS: usize = 20_000;

const LINE_COLOURS: [RGBColor; 6] = [
    BLUE,
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    MAGENTA,
    CYAN,
    BLACK,
];

lazy_static::lazy_static! {
    static ref SEGMENT_SHADE: RGBAColor = RED.mix(0.15);

    static ref LEGEND_BACKGROUND: RGBAColor = WHITE.mix(0.8);
}

fn draw_err<E: std::fmt::Display>(e: E) -> PlotError {
    PlotError::Plotters(e.to_string())
}

/// (seconds since `epoch`, value) pairs for the finite samples of a line.
fn points(line: Line, epoch: f64) -> impl Iterator<Item = (f64, f64)> + '_ {
    let step = (line.data.len() / MAX_POINTS).max(1);
    let dt = line.sample_rate.recip();
    let offset = line.t0 - epoch;
    line.data
        .into_iter()
        .enumerate()
        .step_by(step)
        .filter(|(_, v)| v.is_finite())
        .map(move |(i, &v)| (offset + i as f64 * dt, v))
}

/// A range covering `[min, max]` with a little room either side.
fn padded_range(min: f64, max: f64) -> Range<f64> {
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let span = max - min;
    if span <= f64::EPSILON * max.abs().max(1.0) {
        return (min - 1.0)..(max + 1.0);
    }
    (min - 0.05 * span)..(max + 0.05 * span)
}

fn extent<I: Iterator<Item = f64>>(values: I) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

pub(super) fn lines(
    path: &Path,
    title: &str,
    y_label: &str,
    epoch: f64,
    lines: &[Line],
) -> Result<(), PlotError> {
    let (x_min, x_max) = extent(lines.iter().flat_map(|l| points(*l, epoch).map(|(x, _)| x)));
    let (y_min, y_max) = extent(lines.iter().flat_map(|l| points(*l, epoch).map(|(_, y)| y)));

    let root = BitMapBackend::new(path, (X_PIXELS, Y_PIXELS)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;
    let mut cc = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(padded_range(x_min, x_max), padded_range(y_min, y_max))
        .map_err(draw_err)?;
    cc.configure_mesh()
        .x_desc(format!("Time [s] from GPS {epoch}"))
        .y_desc(y_label)
        .draw()
        .map_err(draw_err)?;

    for (i, line) in lines.iter().enumerate() {
        let colour = LINE_COLOURS[i % LINE_COLOURS.len()];
        cc.draw_series(LineSeries::new(
            points(*line, epoch),
            colour.stroke_width(1),
        ))
        .map_err(draw_err)?
        .label(line.label)
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], colour));
    }
    cc.configure_series_labels()
        .background_style(&*LEGEND_BACKGROUND)
        .border_style(&BLACK)
        .draw()
        .map_err(draw_err)?;

    root.present().map_err(draw_err)?;
    Ok(())
}

pub(super) fn cumulative(path: &Path, title: &str, correlations: &[f64]) -> Result<(), PlotError> {
    let pairs: Vec<(f64, f64)> = correlations
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_finite())
        .map(|(i, &r)| ((i + 1) as f64, r))
        .collect();
    let y_min = pairs.iter().map(|p| p.1).fold(0.0, f64::min);

    let root = BitMapBackend::new(path, (X_PIXELS, Y_PIXELS)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;
    let mut cc = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.5..(correlations.len() as f64 + 0.5), y_min..1.05)
        .map_err(draw_err)?;
    cc.configure_mesh()
        .x_desc("Number of channels in the model")
        .y_desc("Correlation with the primary channel")
        .draw()
        .map_err(draw_err)?;

    cc.draw_series(LineSeries::new(pairs.iter().copied(), BLUE.stroke_width(2)))
        .map_err(draw_err)?;
    cc.draw_series(
        pairs
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 4, BLUE.filled())),
    )
    .map_err(draw_err)?;

    root.present().map_err(draw_err)?;
    Ok(())
}

pub(super) fn fringes(
    path: &Path,
    title: &str,
    epoch: f64,
    harmonics: &[Line],
    triggers: &[Trigger],
    segments: &SegmentList,
    fmax: f64,
) -> Result<(), PlotError> {
    let (x_min, x_max) = extent(
        harmonics
            .iter()
            .flat_map(|l| points(*l, epoch).map(|(x, _)| x))
            .chain(triggers.iter().map(|t| t.time - epoch)),
    );
    let x_range = padded_range(x_min, x_max);
    let y_max = if fmax > 0.0 {
        fmax
    } else {
        let (_, hi) = extent(harmonics.iter().flat_map(|l| points(*l, epoch).map(|(_, y)| y)));
        if hi.is_finite() && hi > 0.0 {
            hi
        } else {
            1.0
        }
    };

    let root = BitMapBackend::new(path, (X_PIXELS, Y_PIXELS)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;
    let mut cc = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, 0.0..y_max)
        .map_err(draw_err)?;
    cc.configure_mesh()
        .x_desc(format!("Time [s] from GPS {epoch}"))
        .y_desc("Frequency [Hz]")
        .draw()
        .map_err(draw_err)?;

    cc.draw_series(segments.iter().map(|s| {
        Rectangle::new(
            [(s.start - epoch, 0.0), (s.end - epoch, y_max)],
            SEGMENT_SHADE.filled(),
        )
    }))
    .map_err(draw_err)?;

    for (i, line) in harmonics.iter().enumerate() {
        let colour = LINE_COLOURS[i % LINE_COLOURS.len()];
        cc.draw_series(LineSeries::new(
            points(*line, epoch).map(|(x, y)| (x, y.min(y_max))),
            colour.stroke_width(1),
        ))
        .map_err(draw_err)?
        .label(line.label)
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], colour));
    }

    cc.draw_series(
        triggers
            .iter()
            .filter(|t| t.frequency <= y_max)
            .map(|t| Circle::new((t.time - epoch, t.frequency), 3, BLACK.filled())),
    )
    .map_err(draw_err)?
    .label("Triggers")
    .legend(|(x, y)| Circle::new((x + 10, y), 3, BLACK.filled()));

    cc.configure_series_labels()
        .background_style(&*LEGEND_BACKGROUND)
        .border_style(&BLACK)
        .draw()
        .map_err(draw_err)?;

    root.present().map_err(draw_err)?;
    Ok(())
}
