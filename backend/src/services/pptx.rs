//! Minimal PresentationML writer: blank-layout slides holding text boxes and
//! pictures, packaged as a `.pptx` zip that PowerPoint and LibreOffice open.

use crate::utils::escape_xml;
use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const EMU_PER_INCH: f64 = 914_400.0;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const DOC_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub fn inches(value: f64) -> i64 {
    (value * EMU_PER_INCH).round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    fn hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub size_pt: f64,
    pub bold: bool,
    pub color: Option<Rgb>,
    pub align: Align,
    pub line_spacing: Option<f64>,
}

impl TextStyle {
    pub fn new(size_pt: f64) -> Self {
        TextStyle {
            size_pt,
            bold: false,
            color: None,
            align: Align::Left,
            line_spacing: None,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }

    pub fn line_spacing(mut self, multiple: f64) -> Self {
        self.line_spacing = Some(multiple);
        self
    }
}

/// Position and size in EMUs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Frame {
    pub fn inches(x: f64, y: f64, width: f64, height: f64) -> Self {
        Frame {
            x: inches(x),
            y: inches(y),
            cx: inches(width),
            cy: inches(height),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Shape {
    TextBox {
        frame: Frame,
        text: String,
        style: TextStyle,
        word_wrap: bool,
    },
    Picture {
        frame: Frame,
        media_index: usize,
        description: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Slide {
    pub background: Option<Rgb>,
    pub shapes: Vec<Shape>,
}

impl Slide {
    pub fn add_textbox(&mut self, frame: Frame, text: &str, style: TextStyle, word_wrap: bool) {
        self.shapes.push(Shape::TextBox {
            frame,
            text: text.to_string(),
            style,
            word_wrap,
        });
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.shapes.iter().filter_map(|s| match s {
            Shape::TextBox { text, .. } => Some(text.as_str()),
            Shape::Picture { .. } => None,
        })
    }
}

struct Media {
    extension: &'static str,
    bytes: Vec<u8>,
}

pub struct Presentation {
    pub width: i64,
    pub height: i64,
    pub title: String,
    slides: Vec<Slide>,
    media: Vec<Media>,
}

impl Presentation {
    pub fn new(width_in: f64, height_in: f64, title: &str) -> Self {
        Presentation {
            width: inches(width_in),
            height: inches(height_in),
            title: title.to_string(),
            slides: Vec::new(),
            media: Vec::new(),
        }
    }

    pub fn add_slide(&mut self) -> &mut Slide {
        self.slides.push(Slide::default());
        let last = self.slides.len() - 1;
        &mut self.slides[last]
    }

    /// Drops the most recent slide, e.g. when its content could not be placed.
    pub fn pop_slide(&mut self) -> Option<Slide> {
        self.slides.pop()
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    /// Adds a picture to the most recent slide, scaled to `width` EMUs with the
    /// image's aspect ratio preserved.
    pub fn add_picture(&mut self, image_path: &Path, x: i64, y: i64, width: i64) -> Result<()> {
        if self.slides.is_empty() {
            return Err(anyhow!("add a slide before adding a picture"));
        }
        let extension = match image_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("png") => "png",
            Some("jpg") | Some("jpeg") => "jpeg",
            other => return Err(anyhow!("Unsupported picture format: {other:?}")),
        };
        let (px_w, px_h) = image::image_dimensions(image_path)
            .with_context(|| format!("Failed to read image {}", image_path.display()))?;
        if px_w == 0 {
            return Err(anyhow!("Image {} has zero width", image_path.display()));
        }
        let bytes = std::fs::read(image_path)?;

        let height = (width as f64 * px_h as f64 / px_w as f64).round() as i64;
        let description = image_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        self.media.push(Media { extension, bytes });
        let media_index = self.media.len();
        let Some(slide) = self.slides.last_mut() else {
            return Err(anyhow!("add a slide before adding a picture"));
        };
        slide.shapes.push(Shape::Picture {
            frame: Frame {
                x,
                y,
                cx: width,
                cy: height,
            },
            media_index,
            description,
        });
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut put = |name: &str, bytes: &[u8]| -> Result<()> {
            zip.start_file(name, options)?;
            zip.write_all(bytes)?;
            Ok(())
        };

        put("[Content_Types].xml", self.content_types().as_bytes())?;
        put("_rels/.rels", root_rels().as_bytes())?;
        put("docProps/core.xml", self.core_props().as_bytes())?;
        put("docProps/app.xml", self.app_props().as_bytes())?;
        put("ppt/presentation.xml", self.presentation_xml().as_bytes())?;
        put(
            "ppt/_rels/presentation.xml.rels",
            self.presentation_rels().as_bytes(),
        )?;
        put("ppt/slideMasters/slideMaster1.xml", SLIDE_MASTER.as_bytes())?;
        put(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            SLIDE_MASTER_RELS.as_bytes(),
        )?;
        put("ppt/slideLayouts/slideLayout1.xml", SLIDE_LAYOUT.as_bytes())?;
        put(
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            SLIDE_LAYOUT_RELS.as_bytes(),
        )?;
        put("ppt/theme/theme1.xml", THEME.as_bytes())?;

        for (i, slide) in self.slides.iter().enumerate() {
            let n = i + 1;
            put(&format!("ppt/slides/slide{n}.xml"), slide_xml(slide).as_bytes())?;
            put(
                &format!("ppt/slides/_rels/slide{n}.xml.rels"),
                slide_rels(slide, &self.media).as_bytes(),
            )?;
        }
        for (i, media) in self.media.iter().enumerate() {
            put(
                &format!("ppt/media/image{}.{}", i + 1, media.extension),
                &media.bytes,
            )?;
        }

        zip.finish()?;
        Ok(())
    }

    fn content_types(&self) -> String {
        let mut xml = format!(
            r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#
        );
        for n in 1..=self.slides.len() {
            let _ = write!(
                xml,
                r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
            );
        }
        xml.push_str("</Types>");
        xml
    }

    fn core_props(&self) -> String {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        format!(
            r#"{XML_DECL}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>yt-trend-report</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified></cp:coreProperties>"#,
            escape_xml(&self.title)
        )
    }

    fn app_props(&self) -> String {
        format!(
            r#"{XML_DECL}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>yt-trend-report</Application><Slides>{}</Slides></Properties>"#,
            self.slides.len()
        )
    }

    fn presentation_xml(&self) -> String {
        let mut ids = String::new();
        for i in 0..self.slides.len() {
            let _ = write!(ids, r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 3);
        }
        let slide_list = if ids.is_empty() {
            String::new()
        } else {
            format!("<p:sldIdLst>{ids}</p:sldIdLst>")
        };
        format!(
            r#"{XML_DECL}<p:presentation {NS} saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>{slide_list}<p:sldSz cx="{}" cy="{}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
            self.width, self.height
        )
    }

    fn presentation_rels(&self) -> String {
        let mut xml = format!(
            r#"{XML_DECL}<Relationships xmlns="{REL_NS}"><Relationship Id="rId1" Type="{DOC_REL}/slideMaster" Target="slideMasters/slideMaster1.xml"/><Relationship Id="rId2" Type="{DOC_REL}/theme" Target="theme/theme1.xml"/>"#
        );
        for i in 0..self.slides.len() {
            let _ = write!(
                xml,
                r#"<Relationship Id="rId{}" Type="{DOC_REL}/slide" Target="slides/slide{}.xml"/>"#,
                i + 3,
                i + 1
            );
        }
        xml.push_str("</Relationships>");
        xml
    }
}

fn root_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{REL_NS}"><Relationship Id="rId1" Type="{DOC_REL}/officeDocument" Target="ppt/presentation.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="{DOC_REL}/extended-properties" Target="docProps/app.xml"/></Relationships>"#
    )
}

const GROUP_HEADER: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;

fn xfrm(frame: &Frame) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        frame.x, frame.y, frame.cx, frame.cy
    )
}

fn paragraph_xml(line: &str, style: &TextStyle) -> String {
    let mut ppr = String::new();
    if style.align == Align::Center {
        ppr.push_str(r#" algn="ctr""#);
    }
    let spacing = style
        .line_spacing
        .map(|m| {
            format!(
                r#"<a:lnSpc><a:spcPct val="{}"/></a:lnSpc>"#,
                (m * 100_000.0).round() as i64
            )
        })
        .unwrap_or_default();
    let ppr = if spacing.is_empty() {
        format!("<a:pPr{ppr}/>")
    } else {
        format!("<a:pPr{ppr}>{spacing}</a:pPr>")
    };

    let size = (style.size_pt * 100.0).round() as i64;
    let bold = if style.bold { r#" b="1""# } else { "" };
    let fill = style
        .color
        .map(|c| format!(r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#, c.hex()))
        .unwrap_or_default();

    if line.is_empty() {
        return format!(r#"<a:p>{ppr}<a:endParaRPr lang="en-US" sz="{size}"{bold} dirty="0"/></a:p>"#);
    }
    format!(
        r#"<a:p>{ppr}<a:r><a:rPr lang="en-US" sz="{size}"{bold} dirty="0">{fill}</a:rPr><a:t>{}</a:t></a:r></a:p>"#,
        escape_xml(line)
    )
}

fn shape_xml(shape: &Shape, id: usize) -> String {
    match shape {
        Shape::TextBox {
            frame,
            text,
            style,
            word_wrap,
        } => {
            let wrap = if *word_wrap { "square" } else { "none" };
            let paragraphs: String = text.lines().map(|l| paragraph_xml(l, style)).collect();
            let paragraphs = if paragraphs.is_empty() {
                paragraph_xml("", style)
            } else {
                paragraphs
            };
            format!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="TextBox {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="{wrap}" rtlCol="0"><a:spAutoFit/></a:bodyPr><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#,
                xfrm(frame)
            )
        }
        Shape::Picture {
            frame,
            media_index,
            description,
        } => format!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {id}" descr="{}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rIdImg{media_index}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
            escape_xml(description),
            xfrm(frame)
        ),
    }
}

fn slide_xml(slide: &Slide) -> String {
    let background = slide
        .background
        .map(|c| {
            format!(
                r#"<p:bg><p:bgPr><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg>"#,
                c.hex()
            )
        })
        .unwrap_or_default();
    // id 1 belongs to the group shape
    let shapes: String = slide
        .shapes
        .iter()
        .enumerate()
        .map(|(i, s)| shape_xml(s, i + 2))
        .collect();
    format!(
        r#"{XML_DECL}<p:sld {NS}><p:cSld>{background}<p:spTree>{GROUP_HEADER}{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

fn slide_rels(slide: &Slide, media: &[Media]) -> String {
    let mut xml = format!(
        r#"{XML_DECL}<Relationships xmlns="{REL_NS}"><Relationship Id="rId1" Type="{DOC_REL}/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>"#
    );
    for shape in &slide.shapes {
        if let Shape::Picture { media_index, .. } = shape {
            let ext = media
                .get(media_index - 1)
                .map(|m| m.extension)
                .unwrap_or("png");
            let _ = write!(
                xml,
                r#"<Relationship Id="rIdImg{media_index}" Type="{DOC_REL}/image" Target="../media/image{media_index}.{ext}"/>"#
            );
        }
    }
    xml.push_str("</Relationships>");
    xml
}

const SLIDE_MASTER: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
    r#"<p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>"#,
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
    r#"</p:spTree></p:cSld>"#,
    r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#,
    r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>"#,
    r#"<p:txStyles><p:titleStyle><a:lvl1pPr><a:defRPr sz="4400"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mj-lt"/></a:defRPr></a:lvl1pPr></p:titleStyle>"#,
    r#"<p:bodyStyle><a:lvl1pPr><a:defRPr sz="1800"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mn-lt"/></a:defRPr></a:lvl1pPr></p:bodyStyle>"#,
    r#"<p:otherStyle><a:lvl1pPr><a:defRPr sz="1800"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mn-lt"/></a:defRPr></a:lvl1pPr></p:otherStyle></p:txStyles>"#,
    r#"</p:sldMaster>"#
);

const SLIDE_MASTER_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="../theme/theme1.xml"/>"#,
    r#"</Relationships>"#
);

const SLIDE_LAYOUT: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="blank" preserve="1">"#,
    r#"<p:cSld name="Blank"><p:spTree>"#,
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
    r#"</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
);

const SLIDE_LAYOUT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/>"#,
    r#"</Relationships>"#
);

const THEME: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Report"><a:themeElements>"#,
    r#"<a:clrScheme name="Report">"#,
    r#"<a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1>"#,
    r#"<a:dk2><a:srgbClr val="2C3E50"/></a:dk2><a:lt2><a:srgbClr val="ECF0F1"/></a:lt2>"#,
    r#"<a:accent1><a:srgbClr val="2980B9"/></a:accent1><a:accent2><a:srgbClr val="27AE60"/></a:accent2>"#,
    r#"<a:accent3><a:srgbClr val="E74C3C"/></a:accent3><a:accent4><a:srgbClr val="F39C12"/></a:accent4>"#,
    r#"<a:accent5><a:srgbClr val="8E44AD"/></a:accent5><a:accent6><a:srgbClr val="95A5A6"/></a:accent6>"#,
    r#"<a:hlink><a:srgbClr val="2980B9"/></a:hlink><a:folHlink><a:srgbClr val="8E44AD"/></a:folHlink>"#,
    r#"</a:clrScheme>"#,
    r#"<a:fontScheme name="Report">"#,
    r#"<a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
    r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
    r#"</a:fontScheme>"#,
    r#"<a:fmtScheme name="Report">"#,
    r#"<a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst>"#,
    r#"<a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst>"#,
    r#"<a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst>"#,
    r#"<a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst>"#,
    r#"</a:fmtScheme></a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>"#
);
