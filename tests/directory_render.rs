use std::{fs, sync::Arc};

use exhibition::{
    application::{
        Contributor, Exhibition, ExhibitionOptions, Publisher, PublisherConfig, RenderSurface,
        SettleOutcome,
    },
    domain::value::{ContainerAttributes, Language, Region},
    infra::{
        sources::{SourceContributor, SourceOptions, SourceText},
        surface::{DirectorySurface, INDEX_FILE, LoadedDocument},
    },
};
use tempfile::TempDir;

fn resource_files(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read output dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".html") && name != INDEX_FILE)
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn file_sources_render_into_the_output_directory() {
    let sources = TempDir::new().expect("sources dir");
    let output = TempDir::new().expect("output dir");
    let markup_path = sources.path().join("index.html");
    fs::write(
        &markup_path,
        "\n        <h1 id=\"title\">Draft</h1>\n        <p>body</p>\n",
    )
    .expect("write markup");

    let markup = SourceContributor::new(
        "markup",
        SourceText::File(markup_path.clone()),
        SourceOptions {
            priority: 2,
            ..SourceOptions::language(Language::Html)
        },
        None,
    )
    .expect("markup source");
    let print = SourceContributor::new(
        "print",
        SourceText::Inline("h1 { font-size: 12pt; }".to_string()),
        SourceOptions {
            region: Region::Head,
            attributes: Some(ContainerAttributes::new().with("media", "print")),
            ..SourceOptions::language(Language::Css)
        },
        None,
    )
    .expect("stylesheet source");

    let surface = Arc::new(DirectorySurface::new(output.path()).expect("surface"));
    let exhibition = Exhibition::with_contributors(
        Arc::new(Publisher::new(
            Arc::clone(&surface) as Arc<dyn RenderSurface>,
            PublisherConfig::default(),
        )),
        ExhibitionOptions::default(),
        [
            Arc::new(markup) as Arc<dyn Contributor>,
            Arc::new(print) as Arc<dyn Contributor>,
        ],
    );

    let first = exhibition.start().await.expect("start").expect("initial render");
    assert_eq!(first.settle, SettleOutcome::Loaded { height: None });

    let index = fs::read_to_string(surface.index_path()).expect("index written");
    assert!(index.contains("<h1 id=\"title\">Draft</h1>\n<p>body</p>"));
    let loaded = LoadedDocument::parse(&index).expect("parses");
    let style = loaded
        .elements_in(Region::Head)
        .find(|entry| entry.tag == "style")
        .expect("style in head");
    assert_eq!(style.attribute("media"), Some("print"));

    fs::write(&markup_path, "<h1 id=\"title\">Final</h1>").expect("edit markup");
    let second = exhibition.request_update().await.expect("republished");

    let index = fs::read_to_string(surface.index_path()).expect("index rewritten");
    assert!(index.contains("Final"));
    assert!(!index.contains("Draft"));
    assert_eq!(
        resource_files(output.path()),
        [format!("{}.html", second.handle.id())]
    );
}
