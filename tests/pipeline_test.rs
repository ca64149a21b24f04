// End-to-end tests: snapshot files on disk through to rendered output

use std::fs;
use std::path::Path;

use heapanim::config::AnimConfig;
use heapanim::diff::classify_all;
use heapanim::errors::{LoadError, RenderError};
use heapanim::layout::GlobalLayout;
use heapanim::render::raster::{RasterOptions, RasterSink};
use heapanim::render::terminal::TerminalSink;
use heapanim::render::{
    play, Classification, DrawInstruction, FrameRenderer, FrameView, RenderSink, Surface,
};
use heapanim::snapshot::load::load_frames;
use heapanim::snapshot::BlockKey;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn config_for(dir: &Path, start: u64, end: u64) -> AnimConfig {
    AnimConfig {
        pattern: dir.join("heapdump.{k}.json").to_string_lossy().into_owned(),
        start,
        end,
        row_bytes: 0x40,
        out: Some(dir.join("anim.gif")),
        width: 64,
        height: 40,
        ..Default::default()
    }
}

/// Three snapshots of `DefaultMallocZone` mixing live (type 1) and other
/// (type 0) blocks, plus a second zone that must be ignored
fn write_sequence(dir: &Path) {
    write(
        dir,
        "heapdump.0.json",
        r#"{"zones":[
            {"index":0,"name":"DefaultMallocZone","blocks":[
                {"type":1,"address":256,"size":16},
                {"type":0,"address":4096,"size":4096}
            ]},
            {"index":1,"name":"OtherZone","blocks":[
                {"type":1,"address":65536,"size":64}
            ]}
        ]}"#,
    );
    write(
        dir,
        "heapdump.1.json",
        r#"{"zones":[
            {"index":0,"name":"DefaultMallocZone","blocks":[
                {"type":1,"address":256,"size":16},
                {"type":1,"address":512,"size":32},
                {"type":0,"address":8192,"size":16}
            ]}
        ]}"#,
    );
    write(
        dir,
        "heapdump.2.json",
        r#"{"zones":[
            {"index":0,"name":"DefaultMallocZone","blocks":[
                {"type":1,"address":512,"size":32},
                {"type":1,"address":300,"size":2}
            ]}
        ]}"#,
    );
}

/// Records every instruction list it is handed
#[derive(Default)]
struct Recorder {
    frames: Vec<Vec<DrawInstruction>>,
}

impl RenderSink for Recorder {
    fn surface(&self) -> Surface {
        Surface::new(64, 40)
    }

    fn draw_frame(&mut self, view: &FrameView<'_>) -> Result<(), RenderError> {
        self.frames.push(view.instructions.to_vec());
        Ok(())
    }
}

#[test]
fn test_only_live_blocks_of_selected_zone_are_drawn() {
    let dir = tempfile::tempdir().unwrap();
    write_sequence(dir.path());
    let config = config_for(dir.path(), 0, 2);

    let report = load_frames(&config).unwrap();
    assert_eq!(report.frames.len(), 3);
    assert!(report.skipped.is_empty());

    let layout = GlobalLayout::compute(&report.frames, config.row_bytes);
    assert_eq!(layout.base_address, 256);
    assert_eq!(layout.limit_address, 544);
    assert_eq!(layout.row_count, 5);

    let classes = classify_all(&report.frames);
    assert_eq!(classes[0].new, vec![BlockKey::new(256, 16)]);
    assert_eq!(classes[1].existing, vec![BlockKey::new(256, 16)]);
    assert_eq!(classes[1].new, vec![BlockKey::new(512, 32)]);
    assert_eq!(classes[2].existing, vec![BlockKey::new(512, 32)]);
    assert_eq!(classes[2].new, vec![BlockKey::new(300, 2)]);

    let mut recorder = Recorder::default();
    let renderer = FrameRenderer::new(layout, 0);
    play(&report.frames, &renderer, "t", &mut recorder).unwrap();

    // Type 0 blocks and other zones never produce instructions
    let drawn: Vec<(u64, u64, u64, Classification)> = recorder
        .frames
        .iter()
        .flatten()
        .map(|i| (i.row, i.column, i.length, i.classification))
        .collect();
    assert_eq!(
        drawn,
        vec![
            (0, 0, 16, Classification::New),
            (0, 0, 16, Classification::Existing),
            (4, 0, 32, Classification::New),
            (4, 0, 32, Classification::Existing),
            (0, 44, 2, Classification::New),
        ]
    );
}

#[test]
fn test_gif_and_summary_png_are_written() {
    let dir = tempfile::tempdir().unwrap();
    write_sequence(dir.path());
    let config = config_for(dir.path(), 0, 2);

    let report = load_frames(&config).unwrap();
    let layout = GlobalLayout::compute(&report.frames, config.row_bytes);
    let mut sink = RasterSink::create(RasterOptions {
        width: config.width,
        height: config.height,
        gif: config.out.clone(),
        png_dir: None,
        summary_png: Some(config.summary_png()),
    })
    .unwrap();

    let summary = play(
        &report.frames,
        &FrameRenderer::new(layout, config.min_px),
        "DefaultMallocZone",
        &mut sink,
    )
    .unwrap();

    assert_eq!(summary.frames, 3);
    assert!(fs::metadata(dir.path().join("anim.gif")).unwrap().len() > 0);
    let still = image::open(dir.path().join("anim.png")).unwrap();
    assert_eq!((still.width(), still.height()), (64, 40));
}

#[test]
fn test_malformed_file_aborts_load() {
    let dir = tempfile::tempdir().unwrap();
    write_sequence(dir.path());
    write(dir.path(), "heapdump.1.json", "<html>not a heap dump</html>");

    let err = load_frames(&config_for(dir.path(), 0, 2)).unwrap_err();

    match err {
        LoadError::Parse(parse) => {
            assert!(parse.path.ends_with("heapdump.1.json"));
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_damaged_file_is_recovered() {
    let dir = tempfile::tempdir().unwrap();
    write_sequence(dir.path());
    // Truncated mid-record after one complete block
    write(
        dir.path(),
        "heapdump.2.json",
        r#"{"zones":[{"index":0,"name":"DefaultMallocZone","blocks":[
            {"type":1,"address":512,"size":32},
            {"type":1,"addr"#,
    );

    let report = load_frames(&config_for(dir.path(), 0, 2)).unwrap();

    assert_eq!(report.recovered.len(), 1);
    assert!(report.recovered[0].ends_with("heapdump.2.json"));
    assert_eq!(
        report.frames[2].keys().collect::<Vec<_>>(),
        vec![BlockKey::new(512, 32)]
    );
}

#[test]
fn test_missing_files_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_sequence(dir.path());

    let report = load_frames(&config_for(dir.path(), 0, 5)).unwrap();

    assert_eq!(report.frames.len(), 3);
    assert_eq!(report.skipped.len(), 3);
    assert!(report.last_path().unwrap().ends_with("heapdump.2.json"));
}

#[test]
fn test_all_files_missing_is_empty() {
    let dir = tempfile::tempdir().unwrap();

    let err = load_frames(&config_for(dir.path(), 3, 4)).unwrap_err();

    assert!(matches!(err, LoadError::Empty { start: 3, end: 4, .. }));
    assert!(err.to_string().contains("heapdump.{k}.json"));
}

#[test]
fn test_zone_without_live_blocks_is_degenerate() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "heapdump.0.json",
        r#"{"zones":[{"index":0,"name":"DefaultMallocZone","blocks":[
            {"type":0,"address":256,"size":16}
        ]}]}"#,
    );
    let config = config_for(dir.path(), 0, 0);

    let report = load_frames(&config).unwrap();
    let layout = GlobalLayout::compute(&report.frames, config.row_bytes);
    assert!(layout.degenerate);

    let mut preview = TerminalSink::new(20, 5);
    let summary = play(
        &report.frames,
        &FrameRenderer::new(layout, 1),
        "empty",
        &mut preview,
    )
    .unwrap();

    assert_eq!(summary.instructions, 0);
    assert!(preview.last_frame().unwrap().contains("empty (frame 0)"));
}
