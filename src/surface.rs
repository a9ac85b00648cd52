use std::fmt::Write;
use std::path::{Path, PathBuf};

use resvg::usvg::{self, fontdb};
use tiny_skia::{Pixmap, Transform};

use crate::{Color, Error, Result, TextBounds, escape_xml};

pub trait Surface {
    fn width(&self) -> i32;
    fn height(&self) -> i32;
    fn fill_rect(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        fill: Color,
        outline: Color,
        outline_width: i32,
    );
    fn draw_polyline(&mut self, points: &[(i32, i32)], color: Color, width: i32);
    fn draw_text(&mut self, x: i32, y: i32, text: &str, size: i32, color: Color) -> Result<()>;
    fn measure_text(&self, text: &str, size: i32) -> Result<TextBounds>;
    fn grow_right(&mut self, extra: i32);
}

pub struct SvgSurface {
    width: i32,
    height: i32,
    background: Color,
    body: String,
    options: usvg::Options<'static>,
    font_family: Option<String>,
}

impl SvgSurface {
    pub fn new(width: i32, height: i32, background: Color) -> Self {
        let mut options = usvg::Options::default();
        options.fontdb_mut().load_system_fonts();
        Self {
            width,
            height,
            background,
            body: String::new(),
            options,
            font_family: None,
        }
    }

    pub fn with_font_file(mut self, path: &Path) -> Result<Self> {
        let db = self.options.fontdb_mut();
        db.load_font_file(path).map_err(|err| {
            Error::FontUnavailable(format!("failed to load '{}': {err}", path.display()))
        })?;
        let wanted: PathBuf = path.to_path_buf();
        let family = db
            .faces()
            .find(|face| matches!(&face.source, fontdb::Source::File(p) if *p == wanted))
            .and_then(|face| face.families.first().map(|(name, _)| name.clone()))
            .ok_or_else(|| {
                Error::FontUnavailable(format!("no usable face found in '{}'", path.display()))
            })?;
        self.font_family = Some(family);
        Ok(self)
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    fn resolved_family(&self) -> Result<String> {
        let db = &self.options.fontdb;
        if let Some(family) = &self.font_family {
            let query = fontdb::Query {
                families: &[fontdb::Family::Name(family)],
                weight: fontdb::Weight::NORMAL,
                stretch: fontdb::Stretch::Normal,
                style: fontdb::Style::Normal,
            };
            if db.query(&query).is_none() {
                return Err(Error::FontUnavailable(format!(
                    "font family '{family}' is not available"
                )));
            }
            return Ok(family.clone());
        }
        let query = fontdb::Query {
            families: &[fontdb::Family::SansSerif],
            weight: fontdb::Weight::NORMAL,
            stretch: fontdb::Stretch::Normal,
            style: fontdb::Style::Normal,
        };
        if db.query(&query).is_none() {
            return Err(Error::FontUnavailable(
                "no system fonts available".to_string(),
            ));
        }
        Ok("sans-serif".to_string())
    }

    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let _ = write!(
            svg,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
            w = self.width,
            h = self.height,
        );
        let _ = write!(
            svg,
            "  <rect width=\"100%\" height=\"100%\" fill=\"{}\" />\n",
            self.background.svg()
        );
        svg.push_str(&self.body);
        svg.push_str("</svg>\n");
        svg
    }

    pub fn to_png(&self, scale: f32) -> Result<Vec<u8>> {
        if scale <= 0.0 {
            return Err(Error::Png(
                "scale must be greater than zero when rendering PNG output".to_string(),
            ));
        }

        let svg = self.to_svg();
        let tree = usvg::Tree::from_str(&svg, &self.options).map_err(|err| {
            Error::Png(format!("failed to parse generated SVG for PNG export: {err}"))
        })?;

        let size = tree.size().to_int_size();
        let scaled_width = ((size.width() as f32) * scale).ceil();
        let scaled_height = ((size.height() as f32) * scale).ceil();

        if !scaled_width.is_finite() || !scaled_height.is_finite() {
            return Err(Error::Png(
                "scaled dimensions are not finite; try a smaller scale factor".to_string(),
            ));
        }
        if scaled_width < 1.0 || scaled_height < 1.0 {
            return Err(Error::Png(
                "scaled dimensions collapsed below 1px; try a larger scale factor".to_string(),
            ));
        }
        if scaled_width > u32::MAX as f32 || scaled_height > u32::MAX as f32 {
            return Err(Error::Png(
                "scaled dimensions exceed supported limits; try a smaller scale factor".to_string(),
            ));
        }

        let scaled_width = scaled_width as u32;
        let scaled_height = scaled_height as u32;

        let mut pixmap = Pixmap::new(scaled_width, scaled_height).ok_or_else(|| {
            Error::Png(format!(
                "failed to allocate {scaled_width}x{scaled_height} surface for PNG export"
            ))
        })?;

        let transform = Transform::from_scale(scale, scale);
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        pixmap
            .encode_png()
            .map_err(|err| Error::Png(format!("failed to encode PNG output: {err}")))
    }
}

impl Surface for SvgSurface {
    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }

    fn fill_rect(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        fill: Color,
        outline: Color,
        outline_width: i32,
    ) {
        let _ = write!(
            self.body,
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\" />\n",
            x1,
            y1,
            x2 - x1,
            y2 - y1,
            fill.svg(),
            outline.svg(),
            outline_width,
        );
    }

    fn draw_polyline(&mut self, points: &[(i32, i32)], color: Color, width: i32) {
        let points = points
            .iter()
            .map(|(x, y)| format!("{x},{y}"))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = write!(
            self.body,
            "  <polyline points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-linecap=\"round\" />\n",
            points,
            color.svg(),
            width,
        );
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, size: i32, color: Color) -> Result<()> {
        let family = self.resolved_family()?;
        write!(
            self.body,
            "  <text x=\"{}\" y=\"{}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\" dominant-baseline=\"hanging\">{}</text>\n",
            x,
            y,
            escape_xml(&family),
            size,
            color.svg(),
            escape_xml(text),
        )?;
        Ok(())
    }

    fn measure_text(&self, text: &str, size: i32) -> Result<TextBounds> {
        let family = self.resolved_family()?;
        if text.is_empty() {
            return Ok(TextBounds {
                width: 0,
                height: 0,
            });
        }
        let probe = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"1\" height=\"1\"><text x=\"0\" y=\"0\" font-family=\"{}\" font-size=\"{}\">{}</text></svg>",
            escape_xml(&family),
            size,
            escape_xml(text),
        );
        let tree = usvg::Tree::from_str(&probe, &self.options).map_err(|err| {
            Error::Svg(format!("failed to parse text-measurement snippet: {err}"))
        })?;
        let bbox = tree.root().abs_bounding_box();
        Ok(TextBounds {
            width: bbox.width().ceil() as i32,
            height: bbox.height().ceil() as i32,
        })
    }

    fn grow_right(&mut self, extra: i32) {
        self.width += extra.max(0);
    }
}
