//! Page data read through djvulibre's `djvused`, and page images rendered
//! with `ddjvu`.

use super::DocumentSource;
use crate::error::{Error, Result};
use crate::render::PageImage;
use crate::sexpr::{parse_all, SExpr};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Name of the djvused executable looked up on `PATH`.
pub const DJVUSED: &str = "djvused";

/// Name of the ddjvu executable looked up on `PATH`.
pub const DDJVU: &str = "ddjvu";

/// Pixel format of rendered page backgrounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageMode {
    /// Three 8-bit samples per pixel (`ddjvu -format=ppm`)
    #[default]
    Rgb,

    /// One 8-bit sample per pixel (`ddjvu -format=pgm`)
    Grayscale,
}

impl ImageMode {
    fn ddjvu_format(self) -> &'static str {
        match self {
            ImageMode::Rgb => "-format=ppm",
            ImageMode::Grayscale => "-format=pgm",
        }
    }
}

/// A DjVu file read with `djvused -u` and rendered with `ddjvu`.
///
/// Every query spawns one process, so pages can be read from several
/// threads at once.
#[derive(Debug, Clone)]
pub struct Djvused {
    path: PathBuf,
    program: OsString,
    renderer: OsString,
    image_mode: Option<ImageMode>,
}

impl Djvused {
    /// Open a DjVu file.
    ///
    /// The file must exist; the tool itself is only run on the first query.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::Source(format!("{} is not a file", path.display())));
        }
        Ok(Self {
            path: path.to_path_buf(),
            program: OsString::from(DJVUSED),
            renderer: OsString::from(DDJVU),
            image_mode: Some(ImageMode::default()),
        })
    }

    /// Use a different djvused executable.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Use a different ddjvu executable.
    pub fn with_renderer(mut self, renderer: impl Into<OsString>) -> Self {
        self.renderer = renderer.into();
        self
    }

    /// Set how page backgrounds are rendered; `None` renders nothing.
    pub fn with_image_mode(mut self, mode: Option<ImageMode>) -> Self {
        self.image_mode = mode;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn image_mode(&self) -> Option<ImageMode> {
        self.image_mode
    }

    /// Run one djvused script and return its standard output.
    fn run(&self, script: &str) -> Result<Vec<u8>> {
        log::debug!("djvused {:?}: {}", self.path, script);

        let mut command = Command::new(&self.program);
        command.arg("-u").arg(&self.path).arg("-e").arg(script);
        execute(&self.program, command, script)
    }

    fn run_sexpr(&self, script: &str) -> Result<Option<SExpr>> {
        let output = self.run(script)?;
        Ok(parse_all(&output)?.into_iter().next())
    }

    /// Render one page to binary PNM on standard output.
    fn render(&self, index: u32, mode: ImageMode) -> Result<PageImage> {
        let page = format!("-page={}", index + 1);
        log::debug!("ddjvu {:?}: {} {}", self.path, mode.ddjvu_format(), page);

        let mut command = Command::new(&self.renderer);
        command
            .arg(mode.ddjvu_format())
            .arg(&page)
            .arg(&self.path)
            .arg("-");
        let output = execute(&self.renderer, command, &page)?;
        PageImage::from_pnm(&output)
            .map_err(|e| Error::Source(format!("page {} render: {}", index + 1, e)))
    }
}

/// Run a command to completion and return its standard output.
fn execute(program: &OsStr, mut command: Command, what: &str) -> Result<Vec<u8>> {
    let output = command.output().map_err(|e| {
        Error::Source(format!("cannot run {}: {}", program.to_string_lossy(), e))
    })?;

    if !output.status.success() {
        return Err(Error::Source(format!(
            "{} failed on {:?} ({}): {}",
            program.to_string_lossy(),
            what,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(output.stdout)
}

/// djvused selects pages by one-based number.
fn select(index: u32, command: &str) -> String {
    format!("select {}; {}", index + 1, command)
}

/// Parse the page count printed by `n`.
fn parse_page_count(output: &[u8]) -> Result<u32> {
    let text = String::from_utf8_lossy(output);
    text.trim()
        .parse()
        .map_err(|_| Error::Source(format!("unexpected page count {:?}", text.trim())))
}

/// Parse `width=W height=H` as printed by `size`.
fn parse_size(output: &[u8]) -> Result<(u32, u32)> {
    let text = String::from_utf8_lossy(output);
    let mut width = None;
    let mut height = None;

    for field in text.split_whitespace() {
        match field.split_once('=') {
            Some(("width", value)) => width = value.parse().ok(),
            Some(("height", value)) => height = value.parse().ok(),
            _ => {}
        }
    }

    match (width, height) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(Error::Source(format!("unexpected page size {:?}", text.trim()))),
    }
}

impl DocumentSource for Djvused {
    fn page_count(&self) -> Result<u32> {
        parse_page_count(&self.run("n")?)
    }

    fn page_size(&self, index: u32) -> Result<(u32, u32)> {
        parse_size(&self.run(&select(index, "size"))?)
    }

    fn page_text(&self, index: u32) -> Result<Option<SExpr>> {
        self.run_sexpr(&select(index, "print-txt"))
    }

    fn outline(&self) -> Result<Option<SExpr>> {
        self.run_sexpr("print-outline")
    }

    fn page_image(&self, index: u32) -> Result<Option<PageImage>> {
        match self.image_mode {
            Some(mode) => self.render(index, mode).map(Some),
            None => Ok(None),
        }
    }
}
