use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::model::MediaItem;

static WP_IMAGE_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"wp-image-(\d+)").unwrap());

static RELATIVE_MEDIA_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\b(src|href)=(["'])media/"#).unwrap());

static SRCSET_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bsrcset=(["'])([^"']*)(["'])"#).unwrap());

static SRCSET_MEDIA_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|,)(\s*)media/").unwrap());

static SIZE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(/media/[^"'\s,()]*?)(?:-\d+x\d+)+(\.[A-Za-z0-9]+)"#).unwrap()
});

static VIDEO_SHORTCODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(?:youtube|embed)\]\s*(.*?)\s*\[/(?:youtube|embed)\]").unwrap()
});

static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:youtube\.com/watch\?(?:[^\s\[<]*?[&;])?v=|youtu\.be/)([A-Za-z0-9_-]+)").unwrap()
});

/// Rewrite legacy media references so everything resolves under `/media/`.
///
/// Suffix stripping has to run after path prefixing, its pattern is
/// anchored on `/media/`.
pub fn normalize_media_paths(html: &str, media: &BTreeMap<u64, MediaItem>) -> String {
    let html = rewrite_wp_images(html, media);
    let html = prefix_media_paths(&html);
    let html = strip_size_suffixes(&html);
    expand_video_embeds(&html)
}

/// Point `src` URLs of `wp-image-{id}` images at the exported copy
/// `/media/{id}_{filename}`.
pub fn rewrite_wp_images(html: &str, media: &BTreeMap<u64, MediaItem>) -> String {
    let ids: BTreeSet<u64> = WP_IMAGE_CLASS
        .captures_iter(html)
        .filter_map(|caps| caps[1].parse().ok())
        .collect();

    let mut out = html.to_string();
    for id in ids {
        let Some(item) = media.get(&id) else {
            continue;
        };
        let (Some(filename), Some(target)) = (item.filename(), item.public_path()) else {
            continue;
        };
        let (stem, ext) = match filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, ext),
            _ => continue,
        };

        let pattern = format!(
            r#"src="https?://[^"]*/{}[^"/]*\.{}""#,
            regex::escape(stem),
            regex::escape(ext)
        );
        match Regex::new(&pattern) {
            Ok(re) => {
                let replacement = format!("src=\"{}\"", target);
                out = re.replace_all(&out, regex::NoExpand(&replacement)).into_owned();
            }
            Err(e) => log::debug!("Skipping media {}: {}", id, e),
        }
    }
    out
}

/// `src="media/..."`, `href="media/..."` and bare `media/` srcset entries
/// become root-relative.
pub fn prefix_media_paths(html: &str) -> String {
    let html = RELATIVE_MEDIA_ATTR.replace_all(html, "$1=$2/media/");
    SRCSET_ATTR
        .replace_all(&html, |caps: &Captures| {
            let entries = SRCSET_MEDIA_ENTRY.replace_all(&caps[2], "$1$2/media/");
            format!("srcset={}{}{}", &caps[1], entries, &caps[3])
        })
        .into_owned()
}

/// Drop thumbnail size suffixes: `/media/a-300x200.jpg` becomes `/media/a.jpg`.
pub fn strip_size_suffixes(html: &str) -> String {
    SIZE_SUFFIX.replace_all(html, "$1$2").into_owned()
}

/// Expand `[youtube]URL[/youtube]` and `[embed]URL[/embed]` into a
/// responsive iframe. Anything that isn't a YouTube URL is left alone.
pub fn expand_video_embeds(html: &str) -> String {
    VIDEO_SHORTCODE
        .replace_all(html, |caps: &Captures| match YOUTUBE_ID.captures(&caps[1]) {
            Some(id) => youtube_iframe(&id[1]),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn youtube_iframe(id: &str) -> String {
    format!(
        "<div class=\"video-embed\" style=\"position:relative;padding-bottom:56.25%;height:0;overflow:hidden\">\
         <iframe src=\"https://www.youtube.com/embed/{}\" \
         style=\"position:absolute;top:0;left:0;width:100%;height:100%\" \
         frameborder=\"0\" allow=\"accelerometer; encrypted-media; gyroscope; picture-in-picture\" \
         allowfullscreen></iframe></div>",
        id
    )
}
