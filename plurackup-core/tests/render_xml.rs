mod common;

use common::{at, directory, post, reply};
use plurackup_core::contract::Renderer;
use plurackup_core::error::RenderError;
use plurackup_core::model::{Audience, IdentityDirectory, Post};
use plurackup_core::render::markup::{cdata, escape_attr, escape_text};
use plurackup_core::render::XmlRenderer;
use quick_xml::events::Event;
use quick_xml::Reader;
use tempfile::tempdir;

fn render(posts: &[Post], identities: &IdentityDirectory) -> String {
    let dir = tempdir().unwrap();
    let mut renderer = XmlRenderer::new(&dir.path().join("alice"));
    assert!(renderer.path().ends_with("alice.xml"));
    renderer.prepare().unwrap();
    renderer.write_posts(posts, identities).unwrap();
    renderer.postpare().unwrap();
    std::fs::read_to_string(renderer.path()).unwrap()
}

/// Every `content_raw` element's text, CDATA sections concatenated.
fn content_raws(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut found = Vec::new();
    let mut current: Option<String> = None;
    loop {
        match reader.read_event().expect("well-formed XML") {
            Event::Start(e) if e.name().as_ref() == b"content_raw" => current = Some(String::new()),
            Event::CData(c) => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&String::from_utf8(c.into_inner().into_owned()).unwrap());
                }
            }
            Event::End(e) if e.name().as_ref() == b"content_raw" => {
                found.extend(current.take());
            }
            Event::Eof => break,
            _ => {}
        }
    }
    found
}

#[test]
fn escaping_helpers() {
    assert_eq!(escape_text("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
    assert_eq!(escape_attr("say \"hi\" & <go>"), "say &quot;hi&quot; &amp; &lt;go&gt;");
    assert_eq!(cdata("plain"), "<![CDATA[plain]]>");
    assert_eq!(cdata("a]]>b"), "<![CDATA[a]]]]><![CDATA[>b]]>");
}

#[test]
fn raw_content_survives_cdata_terminators() {
    let mut tricky = post(1, at(1, 0));
    tricky.content_raw = "x]]>y <b>&amp;</b>".to_string();
    let mut with_reply = post(2, at(2, 0));
    let mut r = reply(10, 5, at(2, 1));
    r.content_raw = "]]>]]>".to_string();
    with_reply.replies.push(r);

    let xml = render(&[tricky, with_reply], &directory(&[(5, "five")]));

    assert_eq!(
        content_raws(&xml),
        vec![
            "x]]>y <b>&amp;</b>".to_string(),
            "plurk 2".to_string(),
            "]]>]]>".to_string(),
        ]
    );
}

#[test]
fn document_shape_and_identity_attributes() {
    let mut p = post(77, at(4, 12));
    p.favorite_count = 2;
    p.favorers = vec![5, 6];
    p.replies = vec![reply(1, 5, at(4, 13)), reply(2, 6, at(4, 14))];
    p.audience = Audience::Limited(vec![5]);

    let xml = render(&[p], &directory(&[(5, "five")]));

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<plurks>"));
    assert!(xml.ends_with("</plurks>"));
    assert!(xml.contains(
        "<plurk id=\"77\" posted_time=\"Fri, 04 Mar 2011 12:00:00 GMT\" lang=\"en\" favorite_count=\"2\" replurkers_count=\"0\">"
    ));
    assert!(xml.contains("<response id=\"1\" posted_time=\"Fri, 04 Mar 2011 13:00:00 GMT\" lang=\"en\" username=\"five\" displayname=\"five\">"));
    assert!(xml.contains("<response id=\"2\" posted_time=\"Fri, 04 Mar 2011 14:00:00 GMT\" lang=\"en\" unknown_user=\"unknown_user\">"));
    assert!(xml.contains("<favorer username=\"five\" displayname=\"five\" />"));
    assert!(xml.contains("<favorer unknown_user=\"unknown_user\" />"));
    assert!(xml.contains("<limited_to username=\"five\" displayname=\"five\" />"));
    assert!(xml.contains("<replurkers>\n\t\t</replurkers>"));
}

#[test]
fn friends_only_audience_is_a_closed_friends_marker() {
    let mut p = post(3, at(1, 0));
    p.audience = Audience::Friends;
    let xml = render(&[p], &IdentityDirectory::new());

    assert!(xml.contains("<limited_tos>\n\t\t\t<friends />\n\t\t</limited_tos>"));
    // Parses cleanly end to end.
    content_raws(&xml);
}

#[test]
fn writing_before_prepare_is_an_error() {
    let dir = tempdir().unwrap();
    let mut renderer = XmlRenderer::new(&dir.path().join("alice"));
    let err = renderer
        .write_posts(&[post(1, at(1, 0))], &IdentityDirectory::new())
        .unwrap_err();
    assert!(matches!(err, RenderError::NotPrepared(_)));
}
