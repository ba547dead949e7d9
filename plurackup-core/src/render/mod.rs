//! Output renderers and the composite that drives several in one pass.

pub mod html;
pub mod markup;
pub mod xml;

use std::path::{Path, PathBuf};

use crate::contract::Renderer;
use crate::error::RenderError;
use crate::model::{IdentityDirectory, Post};

pub use html::HtmlRenderer;
pub use xml::XmlRenderer;

/// Forwards every lifecycle call to each attached renderer, in attach order.
#[derive(Default)]
pub struct CompositeRenderer {
    renderers: Vec<Box<dyn Renderer>>,
}

impl CompositeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, renderer: Box<dyn Renderer>) {
        self.renderers.push(renderer);
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

impl Renderer for CompositeRenderer {
    fn prepare(&mut self) -> Result<(), RenderError> {
        for renderer in &mut self.renderers {
            renderer.prepare()?;
        }
        Ok(())
    }

    fn write_posts(
        &mut self,
        posts: &[Post],
        identities: &IdentityDirectory,
    ) -> Result<(), RenderError> {
        for renderer in &mut self.renderers {
            renderer.write_posts(posts, identities)?;
        }
        Ok(())
    }

    fn postpare(&mut self) -> Result<(), RenderError> {
        for renderer in &mut self.renderers {
            renderer.postpare()?;
        }
        Ok(())
    }
}

/// `base` with `extension` appended, keeping any dots already in the file name.
pub fn output_path(base: &Path, extension: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}
