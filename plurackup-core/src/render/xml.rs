//! Raw-content XML output (`<base>.xml`), suitable for further processing.
//!
//! Layout:
//! ```text
//! <plurks>
//!   <plurk id posted_time lang favorite_count replurkers_count>
//!     <qualifier/> <qualifier_translated/> <content_raw>CDATA</content_raw>
//!     <responses><response id posted_time lang username displayname | unknown_user>...</responses>
//!     <favorers/> <replurkers/> <limited_tos><friends/> | <limited_to .../></limited_tos>
//!   </plurk>
//! </plurks>
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use super::markup::{cdata, escape_attr, escape_text};
use super::output_path;
use crate::contract::Renderer;
use crate::error::RenderError;
use crate::model::{format_server_time, Audience, IdentityDirectory, IdentityRef, Post, Reply};

pub struct XmlRenderer {
    path: PathBuf,
    out: Option<BufWriter<File>>,
}

impl XmlRenderer {
    /// Writes to `<base>.xml`.
    pub fn new(base: &Path) -> Self {
        Self {
            path: output_path(base, "xml"),
            out: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn out(&mut self) -> Result<&mut BufWriter<File>, RenderError> {
        let path = &self.path;
        self.out
            .as_mut()
            .ok_or_else(|| RenderError::NotPrepared(path.display().to_string()))
    }
}

/// Attributes naming an identity, or the unknown marker.
fn identity_attrs(id: IdentityRef, identities: &IdentityDirectory) -> String {
    match identities.get(id) {
        Some(identity) => format!(
            "username=\"{}\" displayname=\"{}\"",
            escape_attr(&identity.handle),
            escape_attr(&identity.display_name)
        ),
        None => "unknown_user=\"unknown_user\"".to_string(),
    }
}

fn write_people(
    out: &mut impl Write,
    element: &str,
    people: &[IdentityRef],
    identities: &IdentityDirectory,
) -> std::io::Result<()> {
    writeln!(out, "\t\t<{element}s>")?;
    for &id in people {
        writeln!(out, "\t\t\t<{element} {} />", identity_attrs(id, identities))?;
    }
    writeln!(out, "\t\t</{element}s>")
}

fn write_reply(
    out: &mut impl Write,
    reply: &Reply,
    identities: &IdentityDirectory,
) -> std::io::Result<()> {
    writeln!(
        out,
        "\t\t\t<response id=\"{}\" posted_time=\"{}\" lang=\"{}\" {}>",
        reply.id,
        format_server_time(&reply.posted),
        escape_attr(&reply.lang),
        identity_attrs(reply.author, identities)
    )?;
    writeln!(out, "\t\t\t\t<qualifier>{}</qualifier>", escape_text(&reply.qualifier))?;
    writeln!(
        out,
        "\t\t\t\t<qualifier_translated>{}</qualifier_translated>",
        escape_text(&reply.qualifier_translated)
    )?;
    writeln!(out, "\t\t\t\t<content_raw>{}</content_raw>", cdata(&reply.content_raw))?;
    writeln!(out, "\t\t\t</response>")
}

fn write_post(
    out: &mut impl Write,
    post: &Post,
    identities: &IdentityDirectory,
) -> std::io::Result<()> {
    writeln!(
        out,
        "\t<plurk id=\"{}\" posted_time=\"{}\" lang=\"{}\" favorite_count=\"{}\" replurkers_count=\"{}\">",
        post.id,
        format_server_time(&post.posted),
        escape_attr(&post.lang),
        post.favorite_count,
        post.replurkers_count
    )?;
    writeln!(out, "\t\t<qualifier>{}</qualifier>", escape_text(&post.qualifier))?;
    writeln!(
        out,
        "\t\t<qualifier_translated>{}</qualifier_translated>",
        escape_text(&post.qualifier_translated)
    )?;
    writeln!(out, "\t\t<content_raw>{}</content_raw>", cdata(&post.content_raw))?;

    writeln!(out, "\t\t<responses>")?;
    for reply in &post.replies {
        write_reply(out, reply, identities)?;
    }
    writeln!(out, "\t\t</responses>")?;

    write_people(out, "favorer", &post.favorers, identities)?;
    write_people(out, "replurker", &post.replurkers, identities)?;
    match &post.audience {
        Audience::Friends => {
            writeln!(out, "\t\t<limited_tos>")?;
            writeln!(out, "\t\t\t<friends />")?;
            writeln!(out, "\t\t</limited_tos>")?;
        }
        Audience::Limited(refs) => write_people(out, "limited_to", refs, identities)?,
        Audience::Public => write_people(out, "limited_to", &[], identities)?,
    }

    writeln!(out, "\t</plurk>")
}

impl Renderer for XmlRenderer {
    fn prepare(&mut self) -> Result<(), RenderError> {
        let mut out = BufWriter::new(File::create(&self.path)?);
        writeln!(out, "<?xml version=\"1.0\" encoding=\"utf-8\"?>")?;
        writeln!(out, "<plurks>")?;
        self.out = Some(out);
        info!(path = %self.path.display(), "Opened XML output");
        Ok(())
    }

    fn write_posts(
        &mut self,
        posts: &[Post],
        identities: &IdentityDirectory,
    ) -> Result<(), RenderError> {
        let out = self.out()?;
        for post in posts {
            write_post(out, post, identities)?;
        }
        Ok(())
    }

    fn postpare(&mut self) -> Result<(), RenderError> {
        let mut out = self
            .out
            .take()
            .ok_or_else(|| RenderError::NotPrepared(self.path.display().to_string()))?;
        write!(out, "</plurks>")?;
        out.flush()?;
        info!(path = %self.path.display(), "Closed XML output");
        Ok(())
    }
}
