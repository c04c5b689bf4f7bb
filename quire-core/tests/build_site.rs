use std::fs;
use std::path::Path;

use quire_core::{BuildError, BuildOptions, Config, EngineKind, UrlFormat, build_site};
use tempfile::TempDir;

const DOMAIN: &str = "example.com";

fn write(root: &Path, path: &str, contents: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).unwrap_or_else(|e| panic!("{path}: {e}"))
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        init_logger();
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("content").join(DOMAIN);

        write(
            &site,
            "metadata.json",
            r#"{
                "categories": [
                    {"id": 1, "name": "Uncategorized", "slug": "uncategorized"},
                    {"id": 5, "name": "News", "slug": "news", "description": "Updates"}
                ],
                "media": [
                    {"id": 42, "title": {"rendered": "Photo"},
                     "source_url": "https://old.example.com/uploads/2024/01/photo.jpg",
                     "media_details": {"width": "800", "height": 600, "file": "2024/01/photo.jpg"}}
                ],
                "users": [{"id": 2, "name": "Ada", "slug": "ada"}]
            }"#,
        );
        write(
            &site,
            "pages/about.md",
            "---\nid: 10\ntitle: About\nslug: about\nstatus: publish\ntype: page\nlink: \"https://example.com/about/\"\n---\n# About\n\n## Content\n\nWe write [here](https://example.com/2024/01/15/hello-world/).\n",
        );
        write(
            &site,
            "pages/draft.md",
            "---\nid: 11\ntitle: Draft\nslug: draft\nstatus: draft\n---\nNot yet.\n",
        );
        write(
            &site,
            "pages/broken.md",
            "no frontmatter here\n",
        );
        let hello = "---\nid: 20\ntitle: Hello World\nslug: hello-world\ndate: \"2024-01-15T10:30:00\"\nstatus: publish\nauthor: 2\nlink: \"https://example.com/hello-world/\"\ncategories: [1, 5]\n---\n# Hello World\n\n## Excerpt\n\nFirst post.\n\n## Content\n\nSee the photo:\n\n<img class=\"wp-image-42\" src=\"https://old.example.com/uploads/2024/01/photo-300x200.jpg\">\n\n- About\n";
        write(&site, "posts/news/hello.md", hello);
        write(&site, "posts/uncategorized/hello.md", hello);
        write(
            &site,
            "posts/uncategorized/loose.md",
            "---\nid: 21\ntitle: Loose\nslug: loose\ndate: \"2023-12-01\"\nstatus: publish\ncategories: [1]\n---\nJust text.\n",
        );
        write(&site, "media/42_photo.jpg", "jpeg");

        let theme = dir.path().join("theme");
        write(
            &theme,
            "base.html",
            "<!DOCTYPE html>\n<html>\n  <head>\n    <!-- theme -->\n    <link href=\"https://example.com/assets/site.css\" rel=\"stylesheet\">\n  </head>\n  <body>\n    {% block body %}{% endblock body %}\n  </body>\n</html>\n",
        );
        write(
            &theme,
            "index.html",
            "{% extends \"base.html\" %}{% block body %}<h1>{{ site.title }}</h1>\n{% for post in posts %}<a href=\"{{ post.canonical | safe }}\">{{ post.title }}</a>\n{% endfor %}{% endblock body %}",
        );
        write(
            &theme,
            "page.html",
            "{% extends \"base.html\" %}{% block body %}<h1>{{ page.title }}</h1>\n{{ page.content | safe }}{% endblock body %}",
        );
        write(
            &theme,
            "post.html",
            "{% extends \"base.html\" %}{% block body %}<h1>{{ page.title }}</h1>\n<p class=\"by\">{% if page.author %}{{ page.author.name }}, {% endif %}{{ page.date_long }}</p>\n{{ page.content | safe }}\n{{ \"Back to the **start**\" | safe_html }}{% endblock body %}",
        );
        write(
            &theme,
            "category.html",
            "{% extends \"base.html\" %}{% block body %}<h1>{{ category.name }}</h1>\n{% for post in category_posts %}<a href=\"{{ post.url | safe }}\">{{ post.title }}</a>\n{% endfor %}{% endblock body %}",
        );
        write(&theme, "assets/site.css", "body {\n  margin: 0;\n}\n");

        Self { dir }
    }

    fn options(&self) -> BuildOptions {
        BuildOptions::new(self.dir.path().join("content"), DOMAIN)
            .theme_dir(self.dir.path().join("theme"))
            .output_dir(self.out())
    }

    fn out(&self) -> std::path::PathBuf {
        self.dir.path().join("public")
    }
}

#[test]
fn builds_a_complete_site() {
    let fixture = Fixture::new();
    let summary = build_site(&fixture.options()).unwrap();
    let out = fixture.out();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.posts, 2);
    // index, about, two posts, one category listing
    assert_eq!(summary.written, 5);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.post_processed, 0);

    let index = read(&out, "index.html");
    assert!(index.contains("<h1>Quire</h1>"));
    let hello_at = index.find("Hello World").unwrap();
    let loose_at = index.find("Loose").unwrap();
    assert!(hello_at < loose_at, "posts are newest first");

    let about = read(&out, "about/index.html");
    assert!(about.contains("<h1>About</h1>"));
    assert!(about.contains("https://example.com/2024/01/15/hello-world/"));
    assert!(!about.contains("# About"));

    let post = read(&out, "2024/01/15/hello-world/index.html");
    assert!(post.contains("<p class=\"by\">Ada, January 15, 2024</p>"));
    assert!(post.contains("src=\"/media/42_photo.jpg\""));
    assert!(post.contains("<li><a href=\"/about/\">About</a></li>"));
    assert!(post.contains("<p>Back to the <strong>start</strong></p>"));
    assert!(!post.contains("First post."), "excerpt is kept apart");

    assert!(out.join("2023/12/01/loose/index.html").is_file());
    assert!(out.join("category/news/index.html").is_file());
    assert!(!out.join("category/uncategorized").exists());
    assert!(!out.join("draft").exists());

    assert_eq!(read(&out, "assets/site.css"), "body {\n  margin: 0;\n}\n");
    assert_eq!(read(&out, "media/42_photo.jpg"), "jpeg");

    let sitemap = read(&out, "sitemap.xml");
    assert!(sitemap.contains("<loc>https://example.com/</loc>"));
    assert!(sitemap.contains("<loc>https://example.com/about/</loc>"));
    assert!(sitemap.contains("<loc>https://example.com/2024/01/15/hello-world/</loc>"));
    assert!(sitemap.contains("<loc>https://example.com/category/news/</loc>"));
    assert!(!sitemap.contains("uncategorized"));

    assert!(read(&out, "robots.txt").contains("Sitemap: https://example.com/sitemap.xml"));
    assert_eq!(
        read(&out, "_redirects"),
        "/hello-world/ /2024/01/15/hello-world/ 301\n"
    );
    assert!(read(&out, "_headers").contains("/media/*"));
}

#[test]
fn configured_build_is_stable_across_runs() {
    let fixture = Fixture::new();
    let mut config = Config::default();
    config.site.title = Some("Field Notes".into());
    config.build.url_format = UrlFormat::Slug;
    config.build.engine = EngineKind::Minijinja;
    config.build.minify = true;
    config.build.relative_links = true;
    let options = fixture.options().config(config);

    let first = build_site(&options).unwrap();
    assert!(first.post_processed > 0);
    let out = fixture.out();

    let post = read(&out, "hello-world/index.html");
    assert!(!post.contains("<!-- theme -->"));
    assert!(!post.contains("\n  "));
    assert!(post.contains("<link href=\"/assets/site.css\" rel=\"stylesheet\">"));
    assert_eq!(read(&out, "assets/site.css"), "body{margin:0;}");

    let index = read(&out, "index.html");
    assert!(index.contains("<h1>Field Notes</h1>"));
    assert!(index.contains("<a href=\"/hello-world/\">Hello World</a>"));

    // absolute locations survive in the sitemap
    assert!(read(&out, "sitemap.xml").contains("<loc>https://example.com/hello-world/</loc>"));
    assert_eq!(read(&out, "_redirects"), "");

    let before = read(&out, "hello-world/index.html");
    build_site(&options).unwrap();
    assert_eq!(read(&out, "hello-world/index.html"), before);
}

#[test]
fn missing_metadata_is_fatal() {
    let fixture = Fixture::new();
    fs::remove_file(fixture.dir.path().join("content").join(DOMAIN).join("metadata.json")).unwrap();

    let err = build_site(&fixture.options()).unwrap_err();
    assert!(matches!(err, BuildError::Load(_)));
    assert!(!fixture.out().exists());
}

#[test]
fn theme_without_index_is_fatal() {
    let fixture = Fixture::new();
    fs::remove_file(fixture.dir.path().join("theme/index.html")).unwrap();

    let err = build_site(&fixture.options()).unwrap_err();
    assert!(matches!(err, BuildError::Templates(_)));
}

#[test]
fn broken_post_template_skips_posts_only() {
    let fixture = Fixture::new();
    write(
        &fixture.dir.path().join("theme"),
        "post.html",
        "{{ page.nope.nope }}",
    );

    let summary = build_site(&fixture.options()).unwrap();
    assert_eq!(summary.skipped, 2);
    assert!(fixture.out().join("about/index.html").is_file());
    assert!(!fixture.out().join("2024/01/15/hello-world/index.html").exists());
}
