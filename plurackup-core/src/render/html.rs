//! Browsable XHTML output (`<base>.html`).
//!
//! Server-rendered `content` is emitted as-is; every other string is escaped.
//! Times are shifted by the configured [`TimeOffset`] and printed as
//! `%Y-%m-%d %H:%M:%S`. Consecutive responses alternate between the
//! `pb_response_bg0` and `pb_response_bg1` classes.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::markup::{escape_attr, escape_text};
use super::output_path;
use crate::config::TimeOffset;
use crate::contract::Renderer;
use crate::error::RenderError;
use crate::model::{Audience, Identity, IdentityDirectory, IdentityRef, Post, Reply};

pub const UNKNOWN_AUTHOR: &str = "Unknown Plurker";
const PROFILE_URL: &str = "http://www.plurk.com/";
const PERMALINK_URL: &str = "http://www.plurk.com/p/";
const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct HtmlRenderer {
    path: PathBuf,
    owner: Identity,
    offset: TimeOffset,
    stylesheet: PathBuf,
    out: Option<BufWriter<File>>,
}

impl HtmlRenderer {
    /// Writes to `<base>.html`; `owner` is the logged-in account.
    pub fn new(base: &Path, owner: Identity, offset: TimeOffset, stylesheet: &Path) -> Self {
        Self {
            path: output_path(base, "html"),
            owner,
            offset,
            stylesheet: stylesheet.to_path_buf(),
            out: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_stylesheet(&self) -> String {
        match fs::read_to_string(&self.stylesheet) {
            Ok(css) => css,
            Err(e) => {
                warn!(
                    error = %e,
                    stylesheet = %self.stylesheet.display(),
                    "Could not open stylesheet; the output HTML will be unstyled"
                );
                String::new()
            }
        }
    }

    fn write_post(
        &self,
        out: &mut impl Write,
        post: &Post,
        identities: &IdentityDirectory,
    ) -> std::io::Result<()> {
        let posted = self.offset.apply(&post.posted).format(DISPLAY_TIME_FORMAT);

        writeln!(out)?;
        writeln!(out, "\t\t<div class=\"plurk_block\">")?;
        writeln!(out, "\t\t\t<table class=\"pb_plurk\">")?;
        writeln!(out, "\t\t\t\t<tr>")?;
        writeln!(
            out,
            "\t\t\t\t\t<td class=\"pb_plurk_name_qualifier\">{} {}</td>",
            profile_link(&self.owner),
            qualifier_span(&post.qualifier, &post.qualifier_translated)
        )?;
        writeln!(out, "\t\t\t\t\t\t<td class=\"pb_plurk_content\">{}<br />", post.content)?;
        writeln!(
            out,
            "\t\t\t\t\t\t\t<p class=\"pb_plurk_timestamp_and_other_stats\"><a href=\"{PERMALINK_URL}{}\">{posted}</a> - {} response(s) - {} favorite(s) - {} replurker(s)</p>",
            post.permalink_code(),
            post.replies.len(),
            post.favorite_count,
            post.replurkers_count
        )?;
        writeln!(out, "\t\t\t\t\t\t</td>")?;
        writeln!(out, "\t\t\t\t</tr>")?;
        writeln!(out, "\t\t\t</table>")?;
        writeln!(out, "\t\t\t")?;
        writeln!(out, "\t\t\t<hr class=\"pb_hr\" />")?;
        writeln!(out, "\t\t\t")?;

        writeln!(out, "\t\t\t<div class=\"pb_responseoffset\">")?;
        for (index, reply) in post.replies.iter().enumerate() {
            self.write_reply(out, reply, index % 2, identities)?;
        }
        writeln!(out, "\t\t\t</div>")?;

        writeln!(out, "\t\t\t<hr class=\"pb_hr\" />")?;
        writeln!(out, "\t\t\t<table class=\"pb_misc_people\">")?;
        write_people_row(out, "Favorers", &post.favorers, identities)?;
        write_people_row(out, "Replurkers", &post.replurkers, identities)?;
        match &post.audience {
            Audience::Public => {}
            Audience::Friends => {
                writeln!(out, "\t\t\t\t<tr>")?;
                writeln!(out, "\t\t\t\t\t<th>Audience</th>")?;
                writeln!(out, "\t\t\t\t\t<td>")?;
                writeln!(out, "\t\t\t\t\t\t(friends)")?;
                writeln!(out, "\t\t\t\t\t</td>")?;
                writeln!(out, "\t\t\t\t</tr>")?;
            }
            Audience::Limited(refs) => write_people_row(out, "Audience", refs, identities)?,
        }
        writeln!(out, "\t\t\t</table>")?;
        writeln!(out, "\t\t</div>")
    }

    fn write_reply(
        &self,
        out: &mut impl Write,
        reply: &Reply,
        parity: usize,
        identities: &IdentityDirectory,
    ) -> std::io::Result<()> {
        let posted = self.offset.apply(&reply.posted).format(DISPLAY_TIME_FORMAT);
        let (extra_class, name) = match identities.get(reply.author) {
            Some(identity) => ("", profile_link(identity)),
            None => (" pb_response_unknown_user", unknown_author()),
        };

        writeln!(
            out,
            "\t\t\t\t<table class=\"pb_response pb_response_bg{parity}{extra_class}\">"
        )?;
        writeln!(out, "\t\t\t\t\t<tr>")?;
        writeln!(
            out,
            "\t\t\t\t\t\t<td class=\"pb_response_name_qualifier\">{name} {}</td>",
            qualifier_span(&reply.qualifier, &reply.qualifier_translated)
        )?;
        writeln!(out, "\t\t\t\t\t\t<td class=\"pb_response_content\">{}<br />", reply.content)?;
        writeln!(out, "\t\t\t\t\t\t\t<p class=\"pb_response_timestamp\">{posted}</p>")?;
        writeln!(out, "\t\t\t\t\t\t</td>")?;
        writeln!(out, "\t\t\t\t\t</tr>")?;
        writeln!(out, "\t\t\t\t</table>")
    }
}

fn profile_link(identity: &Identity) -> String {
    format!(
        "<a href=\"{PROFILE_URL}{}\" class=\"plurk_name\">{}</a>",
        escape_attr(&identity.handle),
        escape_text(&identity.display_name)
    )
}

fn unknown_author() -> String {
    format!("<span class=\"plurk_name\">{UNKNOWN_AUTHOR}</span>")
}

/// `:` and the empty string mean "no qualifier" and get no class.
fn qualifier_span(qualifier: &str, translated: &str) -> String {
    let class = if qualifier.is_empty() || qualifier == ":" {
        String::new()
    } else {
        format!("qualifier qualifier_{}", escape_attr(qualifier))
    };
    format!("<span class=\"{class}\">{}</span>", escape_text(translated))
}

/// One table row listing `people`; nothing at all when the list is empty.
fn write_people_row(
    out: &mut impl Write,
    heading: &str,
    people: &[IdentityRef],
    identities: &IdentityDirectory,
) -> std::io::Result<()> {
    if people.is_empty() {
        return Ok(());
    }
    let names: Vec<String> = people
        .iter()
        .map(|&id| match identities.get(id) {
            Some(identity) => profile_link(identity),
            None => unknown_author(),
        })
        .collect();
    writeln!(out, "\t\t\t\t<tr>")?;
    writeln!(out, "\t\t\t\t\t<th>{heading}</th>")?;
    writeln!(out, "\t\t\t\t\t<td>")?;
    writeln!(out, "\t\t\t\t\t\t{}", names.join(", "))?;
    writeln!(out, "\t\t\t\t\t</td>")?;
    writeln!(out, "\t\t\t\t</tr>")
}

impl Renderer for HtmlRenderer {
    fn prepare(&mut self) -> Result<(), RenderError> {
        let css = self.load_stylesheet();
        let title = escape_text(&self.owner.display_name);

        let mut out = BufWriter::new(File::create(&self.path)?);
        writeln!(out, "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd\">")?;
        writeln!(out, "<html xmlns=\"http://www.w3.org/1999/xhtml\">")?;
        writeln!(out, "\t<head>")?;
        writeln!(out, "\t\t<meta http-equiv=\"Content-Type\" content=\"text/html; charset=UTF-8\" />")?;
        writeln!(out, "\t\t<title>{title}'s plurk Backup</title>")?;
        writeln!(out, "\t\t<style type=\"text/css\">")?;
        write!(out, "{css}")?;
        writeln!(out, "\t\t</style>")?;
        writeln!(out, "\t</head>")?;
        writeln!(out, "\t<body>")?;
        writeln!(out, "\t\t<h1>{title}'s plurk Backup</h1>")?;
        writeln!(out, "\t\t<p class=\"smallnote\">")?;
        writeln!(out, "\t\t\tClick on a plurk's timestamp to go to its page on plurk.com .")?;
        writeln!(out, "\t\t</p>")?;

        self.out = Some(out);
        info!(path = %self.path.display(), "Opened HTML output");
        Ok(())
    }

    fn write_posts(
        &mut self,
        posts: &[Post],
        identities: &IdentityDirectory,
    ) -> Result<(), RenderError> {
        let mut out = self
            .out
            .take()
            .ok_or_else(|| RenderError::NotPrepared(self.path.display().to_string()))?;
        let written = posts
            .iter()
            .try_for_each(|post| self.write_post(&mut out, post, identities));
        self.out = Some(out);
        Ok(written?)
    }

    fn postpare(&mut self) -> Result<(), RenderError> {
        let mut out = self
            .out
            .take()
            .ok_or_else(|| RenderError::NotPrepared(self.path.display().to_string()))?;
        writeln!(out, "\t</body>")?;
        write!(out, "</html>")?;
        out.flush()?;
        info!(path = %self.path.display(), "Closed HTML output");
        Ok(())
    }
}
