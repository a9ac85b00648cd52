use log::debug;

use crate::{
    Color, Error, ExonStyleOverride, LABEL_INSET_FACTOR, LabelOptions, PixelBox, Result, Surface,
    SvgSurface, TextBounds, TrackStyle,
};

pub fn map_coord(c: i64, min_src: i64, max_src: i64, x1: i32, x2: i32) -> Result<i32> {
    if max_src == min_src {
        return Err(Error::DegenerateRange {
            min: min_src,
            max: max_src,
        });
    }
    let fraction = (c - min_src) as f64 / (max_src - min_src) as f64;
    Ok(x1 + (fraction * f64::from(x2 - x1)) as i32)
}

#[derive(Debug, Clone)]
pub struct Exon {
    pub x1: i32,
    pub x2: i32,
    pub y: i32,
    pub height: i32,
    pub style: ExonStyleOverride,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connector {
    pub start: (i32, i32),
    pub apex: (i32, i32),
    pub end: (i32, i32),
}

impl Connector {
    pub fn points(&self) -> [(i32, i32); 3] {
        [self.start, self.apex, self.end]
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    id: Option<String>,
    intervals: Vec<(i64, i64)>,
    pixel_box: PixelBox,
    style: TrackStyle,
    exons: Vec<Exon>,
}

impl Track {
    pub fn new(mut intervals: Vec<(i64, i64)>, pixel_box: PixelBox, style: TrackStyle) -> Self {
        intervals.sort_by_key(|&(start, _)| start);
        Self {
            id: None,
            intervals,
            pixel_box,
            style,
            exons: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn pixel_box(&self) -> PixelBox {
        self.pixel_box
    }

    pub fn style(&self) -> TrackStyle {
        self.style
    }

    pub fn exons(&self) -> &[Exon] {
        &self.exons
    }

    pub fn exons_mut(&mut self) -> &mut [Exon] {
        &mut self.exons
    }

    pub fn coord_range(&self) -> Option<(i64, i64)> {
        let min = self.intervals.iter().map(|&(start, _)| start).min()?;
        let max = self.intervals.iter().map(|&(_, end)| end).max()?;
        Some((min, max))
    }

    pub fn layout(&mut self) -> Result<&[Exon]> {
        // Carry existing per-exon overrides across the re-layout so a caller's
        // recolor of one exon survives a redraw.
        let mut styles: Vec<ExonStyleOverride> =
            self.exons.iter().map(|exon| exon.style.clone()).collect();
        styles.resize_with(self.intervals.len(), ExonStyleOverride::default);

        let mut exons = Vec::with_capacity(self.intervals.len());
        match self.intervals.len() {
            0 => {}
            1 => {
                exons.push(Exon {
                    x1: self.pixel_box.x1,
                    x2: self.pixel_box.x2,
                    y: self.pixel_box.y,
                    height: self.pixel_box.height,
                    style: styles.remove(0),
                });
            }
            _ => {
                if let Some((min_coord, max_coord)) = self.coord_range() {
                    for ((start, end), style) in self.intervals.iter().copied().zip(styles) {
                        let x1 = map_coord(
                            start,
                            min_coord,
                            max_coord,
                            self.pixel_box.x1,
                            self.pixel_box.x2,
                        )?;
                        let x2 = map_coord(
                            end,
                            min_coord,
                            max_coord,
                            self.pixel_box.x1,
                            self.pixel_box.x2,
                        )?;
                        exons.push(Exon {
                            x1,
                            x2,
                            y: self.pixel_box.y,
                            height: self.pixel_box.height,
                            style,
                        });
                    }
                }
            }
        }
        self.exons = exons;
        Ok(&self.exons)
    }

    pub fn connectors(&self) -> Vec<Connector> {
        let mut connectors = Vec::new();
        for pair in self.exons.windows(2) {
            let x1 = pair[0].x2;
            let x2 = pair[1].x1;
            let midpoint = x1 + (x2 - x1) / 2;
            let y = self.pixel_box.y + self.pixel_box.height / 2;
            let apex_y = y - self.pixel_box.height / 4;
            connectors.push(Connector {
                start: (x1, y),
                apex: (midpoint, apex_y),
                end: (x2, y),
            });
        }
        connectors
    }

    pub fn draw<S: Surface>(&mut self, surface: &mut S) -> Result<()> {
        self.layout()?;
        for exon in &self.exons {
            let style = exon.style.apply(self.style);
            surface.fill_rect(
                exon.x1,
                exon.y,
                exon.x2,
                exon.y + exon.height,
                style.fill,
                style.outline,
                style.outline_width,
            );
        }
        for connector in self.connectors() {
            surface.draw_polyline(&connector.points(), self.style.outline, self.style.outline_width);
        }
        Ok(())
    }

    pub fn draw_label<S: Surface>(
        &self,
        surface: &mut S,
        x: i32,
        options: &LabelOptions,
        centre: bool,
    ) -> Result<TextBounds> {
        let text = self.id.as_deref().unwrap_or_default();
        let bounds = surface.measure_text(text, options.size)?;
        let mut y = self.pixel_box.y;
        if centre {
            let half_outline = 0.5 * self.style.outline_width as f32;
            let track_height = self.pixel_box.height as f32 - half_outline;
            let offset = ((track_height - bounds.height as f32) / 2.0) as i32;
            y = self.pixel_box.y + offset - half_outline as i32;
        }
        surface.draw_text(x, y, text, options.size, options.color)?;
        Ok(bounds)
    }
}

#[derive(Debug, Clone)]
pub struct TrackDef {
    pub intervals: Vec<(i64, i64)>,
    pub id: Option<String>,
    pub style: TrackStyle,
}

#[derive(Debug, Clone, Copy)]
pub struct GroupOptions {
    pub width: i32,
    pub margin: i32,
    pub track_height: i32,
    pub track_spacing: i32,
    pub background: Color,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            width: crate::DEFAULT_CANVAS_WIDTH,
            margin: crate::DEFAULT_MARGIN,
            track_height: crate::DEFAULT_TRACK_HEIGHT,
            track_spacing: crate::DEFAULT_TRACK_SPACING,
            background: Color::WHITE,
        }
    }
}

#[derive(Debug)]
pub struct TrackGroup {
    defs: Vec<TrackDef>,
    options: GroupOptions,
    tracks: Vec<Track>,
    built: bool,
}

impl TrackGroup {
    pub fn new(defs: Vec<TrackDef>, options: GroupOptions) -> Result<Self> {
        if defs.is_empty() {
            return Err(Error::NoTracks);
        }
        for (index, def) in defs.iter().enumerate() {
            if def.intervals.is_empty() {
                return Err(Error::EmptyTrack { index });
            }
        }
        Ok(Self {
            defs,
            options,
            tracks: Vec::new(),
            built: false,
        })
    }

    pub fn from_parts(
        coords: Vec<Vec<(i64, i64)>>,
        ids: Option<Vec<String>>,
        fills: Vec<Color>,
        outlines: Vec<Color>,
        outline_width: i32,
        options: GroupOptions,
    ) -> Result<Self> {
        let expected = coords.len();
        if fills.len() != expected {
            return Err(Error::LengthMismatch {
                what: "fill colours",
                expected,
                found: fills.len(),
            });
        }
        if outlines.len() != expected {
            return Err(Error::LengthMismatch {
                what: "outline colours",
                expected,
                found: outlines.len(),
            });
        }
        if let Some(ids) = &ids {
            if ids.len() != expected {
                return Err(Error::LengthMismatch {
                    what: "track identifiers",
                    expected,
                    found: ids.len(),
                });
            }
        }

        let mut defs = Vec::with_capacity(expected);
        for (index, intervals) in coords.into_iter().enumerate() {
            defs.push(TrackDef {
                intervals,
                id: ids.as_ref().map(|ids| ids[index].clone()),
                style: TrackStyle {
                    fill: fills[index],
                    outline: outlines[index],
                    outline_width,
                },
            });
        }
        Self::new(defs, options)
    }

    pub fn global_range(&self) -> (i64, i64) {
        let mut min_coord = i64::MAX;
        let mut max_coord = i64::MIN;
        for def in &self.defs {
            for &(start, end) in &def.intervals {
                min_coord = min_coord.min(start);
                max_coord = max_coord.max(end);
            }
        }
        (min_coord, max_coord)
    }

    pub fn canvas_width(&self) -> i32 {
        self.options.width
    }

    pub fn canvas_height(&self) -> i32 {
        let n = self.defs.len() as i32;
        self.options.margin * 2
            + self.options.track_height * n
            + self.options.track_spacing * (n - 1)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    pub fn build_tracks(&mut self) -> Result<&[Track]> {
        let (min_coord, max_coord) = self.global_range();
        let opts = self.options;
        let drawable_x1 = opts.margin;
        let drawable_x2 = opts.width - opts.margin;

        let mut tracks = Vec::with_capacity(self.defs.len());
        for (index, def) in self.defs.iter().enumerate() {
            let track_min = def
                .intervals
                .iter()
                .map(|&(start, _)| start)
                .min()
                .unwrap_or(min_coord);
            let track_max = def
                .intervals
                .iter()
                .map(|&(_, end)| end)
                .max()
                .unwrap_or(max_coord);
            let x1 = map_coord(track_min, min_coord, max_coord, drawable_x1, drawable_x2)?;
            let x2 = map_coord(track_max, min_coord, max_coord, drawable_x1, drawable_x2)?;
            let y = opts.margin + index as i32 * (opts.track_height + opts.track_spacing);
            let pixel_box = PixelBox {
                x1,
                x2,
                y,
                height: opts.track_height,
            };
            let mut track = Track::new(def.intervals.clone(), pixel_box, def.style);
            if let Some(id) = &def.id {
                track = track.with_id(id.clone());
            }
            track.layout()?;
            tracks.push(track);
        }

        debug!(
            "built {} tracks against genomic range {min_coord}..{max_coord}",
            tracks.len()
        );
        self.tracks = tracks;
        self.built = true;
        Ok(&self.tracks)
    }

    pub fn draw_onto<S: Surface>(
        &mut self,
        surface: &mut S,
        labels: Option<&LabelOptions>,
    ) -> Result<()> {
        if !self.built {
            self.build_tracks()?;
        }

        let opts = self.options;
        let label_x = opts.width - (LABEL_INSET_FACTOR * opts.margin as f32) as i32;
        let mut max_label_width = 0;
        let mut any_label = false;

        for index in 0..self.tracks.len() {
            let track = &mut self.tracks[index];
            track.draw(surface)?;
            if let Some(label_options) = labels {
                if track.id().is_some_and(|id| !id.is_empty()) {
                    let bounds = track.draw_label(surface, label_x, label_options, true)?;
                    max_label_width = max_label_width.max(bounds.width);
                    any_label = true;
                }
            }
        }

        if any_label {
            let remaining = surface.width() - (label_x + max_label_width);
            let extra = opts.margin - remaining;
            if extra > 0 {
                debug!("growing canvas by {extra}px to fit a {max_label_width}px label");
                surface.grow_right(extra);
            }
        }
        Ok(())
    }

    pub fn render_svg(&mut self, labels: Option<&LabelOptions>) -> Result<String> {
        let surface = self.draw_surface(labels)?;
        Ok(surface.to_svg())
    }

    pub fn render_png(&mut self, labels: Option<&LabelOptions>, scale: f32) -> Result<Vec<u8>> {
        let surface = self.draw_surface(labels)?;
        surface.to_png(scale)
    }

    fn draw_surface(&mut self, labels: Option<&LabelOptions>) -> Result<SvgSurface> {
        let mut surface = SvgSurface::new(
            self.options.width,
            self.canvas_height(),
            self.options.background,
        );
        if let Some(label_options) = labels {
            if let Some(path) = &label_options.font_file {
                surface = surface.with_font_file(path)?;
            }
        }
        self.draw_onto(&mut surface, labels)?;
        Ok(surface)
    }
}
