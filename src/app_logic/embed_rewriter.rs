// src/app_logic/embed_rewriter.rs

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::persistence::AttachmentId;

/// What a size name resolves to for the current metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedThumbnail {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// The markup shapes an embed can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum EmbedShape {
    /// `<img src=.. width=.. height=.. class="... size-X wp-image-ID">`, as
    /// written when an image is inserted.
    ImageClassLast,
    /// `<img class="wp-image-ID size-X ..." src=.. width=.. height=..>`, as
    /// left behind by rich editors that reorder attributes.
    ImageClassFirst,
    /// `[caption id="attachment_ID" width=..]...size-X...[/caption]`.
    Caption,
}

/// One embed found in a document, split into the verbatim fragments around
/// the values that get substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedMatch {
    pub shape: EmbedShape,
    /// The whole matched text.
    pub span: String,
    pub size: String,
    head: String,
    /// Text between the src value and the width value, then between width
    /// and height. Captions carry neither.
    middle: Option<(String, String)>,
    tail: String,
}

impl EmbedMatch {
    fn from_image(shape: EmbedShape, caps: &Captures<'_>) -> Self {
        Self {
            shape,
            span: caps[0].to_string(),
            size: caps["size"].to_string(),
            head: caps["head"].to_string(),
            middle: Some((caps["mid"].to_string(), caps["sep"].to_string())),
            tail: caps["tail"].to_string(),
        }
    }

    fn from_caption(caps: &Captures<'_>, size: &str) -> Self {
        Self {
            shape: EmbedShape::Caption,
            span: caps[0].to_string(),
            size: size.to_string(),
            head: caps["head"].to_string(),
            middle: None,
            tail: caps["tail"].to_string(),
        }
    }

    /// The span with the resolved values swapped in.
    pub fn render(&self, thumb: &ResolvedThumbnail) -> String {
        match &self.middle {
            Some((mid, sep)) => format!(
                "{}{}{}{}{}{}{}",
                self.head,
                attribute_safe(&thumb.url),
                mid,
                thumb.width,
                sep,
                thumb.height,
                self.tail
            ),
            None => format!("{}{}{}", self.head, thumb.width, self.tail),
        }
    }
}

fn attribute_safe(url: &str) -> String {
    url.replace('"', "%22")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    pub changed: bool,
    /// Number of embeds whose text was substituted.
    pub replaced: usize,
    /// Size names found in embeds that did not resolve. Those embeds were
    /// left as they were.
    pub unresolved: Vec<String>,
}

/// The three embed patterns, compiled for one attachment.
#[derive(Debug, Clone)]
pub struct EmbedPatterns {
    attachment_id: AttachmentId,
    image_class_last: Regex,
    image_class_first: Regex,
    caption: Regex,
    size_class: Regex,
}

impl EmbedPatterns {
    pub fn new(attachment_id: AttachmentId) -> Result<Self, regex::Error> {
        let id = regex::escape(&attachment_id.to_string());

        let image_class_last = Regex::new(&format!(
            r#"(?i)(?P<head><img\b[^>]*?\ssrc=")[^"]*(?P<mid>"[^>]*?\swidth=")\d+(?P<sep>"\s+height=")\d+(?P<tail>"[^>]*?\sclass="[^"]*?\bsize-(?P<size>[\w-]+)\s+wp-image-{id}\b[^"]*"[^>]*>)"#
        ))?;
        let image_class_first = Regex::new(&format!(
            r#"(?i)(?P<head><img\b[^>]*?\sclass="[^"]*?\bwp-image-{id}\b[^"]*?\bsize-(?P<size>[\w-]+)[^"]*"[^>]*?\ssrc=")[^"]*(?P<mid>"[^>]*?\swidth=")\d+(?P<sep>"\s+height=")\d+(?P<tail>"[^>]*>)"#
        ))?;
        let caption = Regex::new(&format!(
            r#"(?is)(?P<head>\[caption\s+id="attachment_{id}"[^\]]*?\swidth=")\d+(?P<tail>"[^\]]*\](?P<body>.*?)\[/caption\])"#
        ))?;
        let size_class = Regex::new(r"(?i)\bsize-([\w-]+)")?;

        Ok(Self {
            attachment_id,
            image_class_last,
            image_class_first,
            caption,
            size_class,
        })
    }

    /// Token every embed of this attachment contains. Documents without it
    /// cannot hold a match.
    pub fn search_token(&self) -> String {
        format!("wp-image-{}", self.attachment_id)
    }

    /// All embeds of this attachment in `text`. Captions come first, since
    /// a caption's span encloses an image embed.
    pub fn find_matches(&self, text: &str) -> Vec<EmbedMatch> {
        let mut matches = Vec::new();

        for caps in self.caption.captures_iter(text) {
            let Some(size) = self
                .size_class
                .captures(&caps["body"])
                .map(|c| c[1].to_string())
            else {
                log::debug!(
                    "EmbedRewriter: Ignoring caption for attachment {} without a size class",
                    self.attachment_id
                );
                continue;
            };
            matches.push(EmbedMatch::from_caption(&caps, &size));
        }
        for caps in self.image_class_last.captures_iter(text) {
            matches.push(EmbedMatch::from_image(EmbedShape::ImageClassLast, &caps));
        }
        for caps in self.image_class_first.captures_iter(text) {
            matches.push(EmbedMatch::from_image(EmbedShape::ImageClassFirst, &caps));
        }
        matches
    }

    /// Rewrites every resolvable embed in `text`. Text outside the matched
    /// spans is returned byte for byte.
    pub fn rewrite<F>(&self, text: &str, mut resolve: F) -> Rewrite
    where
        F: FnMut(&str) -> Option<ResolvedThumbnail>,
    {
        let mut replacements = Vec::new();
        let mut unresolved = Vec::new();

        for found in self.find_matches(text) {
            match resolve(&found.size) {
                Some(thumb) => {
                    let replacement = found.render(&thumb);
                    if replacement != found.span {
                        replacements.push((found.span, replacement));
                    }
                }
                None => {
                    log::warn!(
                        "EmbedRewriter: No '{}' thumbnail for attachment {}, leaving {} embed untouched",
                        found.size,
                        self.attachment_id,
                        found.shape
                    );
                    unresolved.push(found.size);
                }
            }
        }

        let mut out = text.to_string();
        let mut replaced = 0;
        for (search, replace) in &replacements {
            if out.contains(search.as_str()) {
                out = out.replace(search.as_str(), replace);
                replaced += 1;
            }
        }

        Rewrite {
            changed: out != text,
            text: out,
            replaced,
            unresolved,
        }
    }
}

/// Convenience wrapper for a single document.
pub fn rewrite_embeds<F>(
    text: &str,
    attachment_id: AttachmentId,
    resolve: F,
) -> Result<Rewrite, regex::Error>
where
    F: FnMut(&str) -> Option<ResolvedThumbnail>,
{
    Ok(EmbedPatterns::new(attachment_id)?.rewrite(text, resolve))
}
