use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use flipbook::{load_book, CachingLoader, DirectoryLoader, LoadedBook};
use flipbook_render::{
    HeuristicMeasurer, LayoutMode, PaginationConfig, Reader, ReaderConfig, RenderEngine,
    RenderEngineOptions,
};
use flipbook_render_web::{preview, toc_html, walk_views, ViewSnapshot};
use serde::{Deserialize, Serialize};

const DEFAULT_CONTENT_DIR: &str = "content";
const DEFAULT_OUT_PATH: &str = "target/web-preview/index.html";

#[derive(Clone, Debug)]
struct Args {
    content_dir: String,
    out_path: String,
    config_path: Option<String>,
    spread_width: Option<u32>,
    spread_height: Option<u32>,
    single_width: Option<u32>,
    single_height: Option<u32>,
    words_per_page: Option<usize>,
    table_of_contents: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Viewport {
    width: u32,
    height: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct PreviewConfig {
    spread_viewport: Viewport,
    single_viewport: Viewport,
    /// Paginate by word quota instead of measured height.
    words_per_page: Option<usize>,
    /// Prepend a generated contents page.
    table_of_contents: bool,
    single_turn_ms: u64,
    spread_turn_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        let reader = ReaderConfig::default();
        Self {
            spread_viewport: Viewport {
                width: 1280,
                height: 800,
            },
            single_viewport: Viewport {
                width: 390,
                height: 780,
            },
            words_per_page: None,
            table_of_contents: false,
            single_turn_ms: reader.single_turn.as_millis() as u64,
            spread_turn_ms: reader.spread_turn.as_millis() as u64,
        }
    }
}

impl PreviewConfig {
    fn load(path: Option<&str>) -> Result<Self, String> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?;
        serde_json::from_str(&text).map_err(|e| format!("{path}: {e}"))
    }

    fn with_args(mut self, args: &Args) -> Self {
        if let Some(width) = args.spread_width {
            self.spread_viewport.width = width;
        }
        if let Some(height) = args.spread_height {
            self.spread_viewport.height = height;
        }
        if let Some(width) = args.single_width {
            self.single_viewport.width = width;
        }
        if let Some(height) = args.single_height {
            self.single_viewport.height = height;
        }
        if args.words_per_page.is_some() {
            self.words_per_page = args.words_per_page;
        }
        if args.table_of_contents {
            self.table_of_contents = true;
        }
        self
    }

    fn normalized(mut self) -> Self {
        let max_single = LayoutMode::SINGLE_PAGE_MAX_WIDTH;
        self.single_viewport.width = self.single_viewport.width.clamp(240, max_single);
        self.single_viewport.height = self.single_viewport.height.clamp(240, 4096);
        self.spread_viewport.width = self.spread_viewport.width.clamp(max_single + 1, 4096);
        self.spread_viewport.height = self.spread_viewport.height.clamp(240, 4096);
        self.words_per_page = self.words_per_page.map(|n| n.max(1));
        self
    }

    fn viewport(&self, mode: LayoutMode) -> Viewport {
        match mode {
            LayoutMode::Single => self.single_viewport,
            LayoutMode::Spread => self.spread_viewport,
        }
    }

    fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            single_turn: Duration::from_millis(self.single_turn_ms),
            spread_turn: Duration::from_millis(self.spread_turn_ms),
            ..ReaderConfig::default()
        }
    }

    fn engine_options(&self, mode: LayoutMode) -> RenderEngineOptions {
        let viewport = self.viewport(mode);
        let mut opts = RenderEngineOptions::for_viewport(viewport.width, viewport.height, mode)
            .with_table_of_contents(self.table_of_contents);
        if let Some(words) = self.words_per_page {
            opts.pagination = opts.pagination.with_word_quota(words);
        }
        opts
    }
}

#[derive(Serialize)]
struct PreviewPayload {
    meta: PreviewMeta,
    single_max_width: u32,
    single: LayoutPayload,
    spread: LayoutPayload,
    warnings: Vec<String>,
    config: PreviewConfig,
}

#[derive(Serialize)]
struct PreviewMeta {
    title: String,
    author: String,
    chapter_count: usize,
    fallback_reason: Option<String>,
    version: &'static str,
}

#[derive(Serialize)]
struct LayoutPayload {
    mode: LayoutMode,
    step: usize,
    page_count: usize,
    profile_id: u32,
    turn_ms: u64,
    viewport: Viewport,
    content: ContentBox,
    toc_html: String,
    views: Vec<ViewSnapshot>,
}

#[derive(Serialize)]
struct ContentBox {
    width: i32,
    height: i32,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {}", msg);
            eprintln!("{}", help_text());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let cli = parse_args(args)?;
    let cfg = PreviewConfig::load(cli.config_path.as_deref())?
        .with_args(&cli)
        .normalized();

    if cli.out_path.is_empty() {
        return Err("--out must not be empty".to_string());
    }
    if let Some(parent) = Path::new(&cli.out_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
    }

    let mut loader = CachingLoader::new(DirectoryLoader::new(&cli.content_dir));
    let book = load_book(&mut loader);
    let payload = render_preview_payload(&book, &cfg)?;
    let data_json = serde_json::to_string(&payload).map_err(|e| e.to_string())?;
    let html = build_html(&payload.meta.title, &data_json);
    std::fs::write(&cli.out_path, html).map_err(|e| e.to_string())?;

    println!(
        "wrote web preview to {} (chapters={}, single_pages={}, spread_pages={}, warnings={})",
        cli.out_path,
        payload.meta.chapter_count,
        payload.single.page_count,
        payload.spread.page_count,
        payload.warnings.len(),
    );
    Ok(())
}

fn render_preview_payload(book: &LoadedBook, cfg: &PreviewConfig) -> Result<PreviewPayload, String> {
    let mut warnings = book.warnings.clone();
    if let Some(reason) = &book.fallback_reason {
        warnings.push(format!("showing demo content: {reason}"));
    }
    let single = render_layout(book, cfg, LayoutMode::Single)?;
    let spread = render_layout(book, cfg, LayoutMode::Spread)?;

    Ok(PreviewPayload {
        meta: PreviewMeta {
            title: book.metadata.title.clone(),
            author: book.metadata.author.clone(),
            chapter_count: book.chapters.len(),
            fallback_reason: book.fallback_reason.clone(),
            version: preview::VERSION,
        },
        single_max_width: LayoutMode::SINGLE_PAGE_MAX_WIDTH,
        single,
        spread,
        warnings,
        config: cfg.clone(),
    })
}

fn render_layout(
    book: &LoadedBook,
    cfg: &PreviewConfig,
    mode: LayoutMode,
) -> Result<LayoutPayload, String> {
    let opts = cfg.engine_options(mode);
    let engine = RenderEngine::new(opts);
    let paginated = engine.assemble(&book.chapters, &HeuristicMeasurer::default());
    let profile_id = paginated.profile_id().0;
    let toc = toc_html(paginated.index());
    let reader_cfg = cfg.reader_config();
    let mut reader = Reader::new(paginated, mode, reader_cfg)
        .ok_or_else(|| format!("{mode:?} layout produced no pages"))?;
    let views = walk_views(&mut reader);
    log::info!(
        "{:?}: {} pages, {} views, profile {:08x}",
        mode,
        reader.total_pages(),
        views.len(),
        profile_id
    );

    let PaginationConfig {
        content_width,
        content_height,
        ..
    } = opts.pagination;
    Ok(LayoutPayload {
        mode,
        step: mode.step(),
        page_count: reader.total_pages(),
        profile_id,
        turn_ms: reader_cfg.turn_duration(mode).as_millis() as u64,
        viewport: cfg.viewport(mode),
        content: ContentBox {
            width: content_width,
            height: content_height,
        },
        toc_html: toc,
        views,
    })
}

fn build_html(title: &str, payload_json: &str) -> String {
    let safe_json = payload_json.replace("</", "<\\/");
    let template = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>__TITLE__</title>
  <style>
    :root {
      --bg: #efe9dd;
      --paper: #fdfaf3;
      --ink: #2a241a;
      --muted: #7a705e;
      --accent: #8a4b2a;
      --line: #d9cfbd;
      --shadow: rgba(40, 28, 12, 0.18);
    }
    * { box-sizing: border-box; }
    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: Georgia, "Iowan Old Style", serif;
      display: flex;
      flex-direction: column;
      align-items: center;
    }
    header { width: 100%; max-width: 1400px; padding: 16px 24px; display: flex; gap: 16px; align-items: baseline; }
    header h1 { font-size: 1.4rem; margin: 0; }
    header .author { color: var(--muted); }
    .warnings { color: #9b2c1f; font-size: 0.85rem; }
    main { display: flex; gap: 24px; width: 100%; max-width: 1400px; padding: 0 24px; }
    nav.toc { min-width: 200px; font-size: 0.9rem; }
    nav.toc ol { padding-left: 18px; }
    nav.toc a { color: var(--accent); text-decoration: none; }
    .toc-pages { color: var(--muted); margin-left: 6px; font-size: 0.8rem; }
    #stage { flex: 1; perspective: 2000px; }
    .book-view { display: flex; justify-content: center; transition: transform 0.2s ease, opacity 0.2s ease; }
    .page {
      position: relative;
      background: var(--paper);
      box-shadow: 0 6px 24px var(--shadow);
      padding: 32px 36px 48px;
      overflow: hidden;
    }
    .page.blank { background: transparent; box-shadow: none; }
    .page-left { border-right: 1px solid var(--line); }
    .page-number { position: absolute; bottom: 16px; left: 0; right: 0; text-align: center; color: var(--muted); font-size: 0.8rem; }
    .chapter-title { font-size: 1.3rem; margin-top: 0; }
    .chapter-title.cont { font-size: 1rem; color: var(--muted); }
    .scene { font-variant: small-caps; }
    .dialogue { font-style: italic; }
    .placeholder { color: #9b2c1f; }
    .turning-next { animation: turn-next var(--turn-ms) ease; }
    .turning-prev { animation: turn-prev var(--turn-ms) ease; }
    @keyframes turn-next { from { transform: rotateY(-12deg); opacity: 0.4; } to { transform: none; opacity: 1; } }
    @keyframes turn-prev { from { transform: rotateY(12deg); opacity: 0.4; } to { transform: none; opacity: 1; } }
    footer { display: flex; gap: 12px; align-items: center; padding: 18px; }
    button { font: inherit; padding: 6px 16px; border: 1px solid var(--line); background: var(--paper); cursor: pointer; }
    button:disabled { opacity: 0.4; cursor: default; }
    .progress { width: 220px; height: 4px; background: var(--line); }
    .progress > div { height: 100%; background: var(--accent); width: 0; }
    @media (max-width: 768px) { nav.toc { display: none; } main { padding: 0 8px; } }
  </style>
</head>
<body>
  <header>
    <h1 id="title"></h1>
    <span class="author" id="author"></span>
    <span class="warnings" id="warnings"></span>
  </header>
  <main>
    <nav class="toc" id="toc"></nav>
    <div id="stage"></div>
  </main>
  <footer>
    <button id="prev" type="button">&larr; Prev</button>
    <div class="progress"><div id="progress-bar"></div></div>
    <span id="page-label"></span>
    <button id="next" type="button">Next &rarr;</button>
  </footer>
  <script id="preview-data" type="application/json">__PAYLOAD__</script>
  <script>
    const data = JSON.parse(document.getElementById("preview-data").textContent);
    const stage = document.getElementById("stage");
    const state = { layout: null, cursor: 1, animating: false, touch: null };

    document.getElementById("title").textContent = data.meta.title;
    document.getElementById("author").textContent = data.meta.author;
    document.getElementById("warnings").textContent = data.warnings.join(" · ");

    function pickLayout() {
      return window.innerWidth <= data.single_max_width ? data.single : data.spread;
    }

    function align(layout, page) {
      const clamped = Math.min(Math.max(page, 1), layout.page_count);
      return layout.step === 2 && clamped % 2 === 0 ? clamped - 1 : clamped;
    }

    function currentView() {
      return state.layout.views.find((v) => v.cursor === state.cursor) || state.layout.views[0];
    }

    function paint(turnClass) {
      const layout = state.layout;
      const view = currentView();
      stage.style.setProperty("--turn-ms", layout.turn_ms + "ms");
      stage.innerHTML = view.html;
      for (const page of stage.querySelectorAll(".page")) {
        page.style.width = layout.content.width + "px";
        page.style.height = (layout.content.height + 80) + "px";
      }
      const book = stage.firstElementChild;
      if (turnClass && book) book.classList.add(turnClass);
      document.getElementById("toc").innerHTML = layout.toc_html;
      document.getElementById("prev").disabled = !view.prev_enabled;
      document.getElementById("next").disabled = !view.next_enabled;
      document.getElementById("progress-bar").style.width = view.progress_percent + "%";
      document.getElementById("page-label").textContent =
        view.pages.join("–") + " / " + layout.page_count;
    }

    function go(target, turnClass) {
      if (state.animating) return;
      state.animating = true;
      state.cursor = target;
      paint(turnClass);
      window.setTimeout(() => { state.animating = false; }, state.layout.turn_ms);
    }

    function turn(direction) {
      if (state.animating) return;
      const view = currentView();
      if (direction === "next" && view.next_enabled) {
        go(state.cursor + state.layout.step, "turning-next");
      } else if (direction === "prev" && view.prev_enabled) {
        go(state.cursor - state.layout.step, "turning-prev");
      }
    }

    function jump(page) {
      if (state.animating || page < 1 || page > state.layout.page_count) return;
      const target = align(state.layout, page);
      if (target === state.cursor) return;
      go(target, target > state.cursor ? "turning-next" : "turning-prev");
    }

    function relayout() {
      const next = pickLayout();
      if (state.layout === next) return;
      const progress = state.layout ? state.cursor / state.layout.page_count : 0;
      state.layout = next;
      state.cursor = align(next, Math.floor(progress * next.page_count) || 1);
      paint(null);
    }

    document.getElementById("next").addEventListener("click", () => turn("next"));
    document.getElementById("prev").addEventListener("click", () => turn("prev"));
    document.addEventListener("keydown", (event) => {
      if (event.key === "ArrowRight") turn("next");
      if (event.key === "ArrowLeft") turn("prev");
    });
    document.addEventListener("click", (event) => {
      const link = event.target.closest("a[data-page]");
      if (!link) return;
      event.preventDefault();
      jump(parseInt(link.dataset.page, 10));
    });

    stage.addEventListener("touchstart", (event) => {
      if (state.animating) return;
      const t = event.touches[0];
      state.touch = { x: t.clientX, y: t.clientY };
    }, { passive: true });
    stage.addEventListener("touchmove", (event) => {
      if (!state.touch) return;
      const t = event.touches[0];
      const dx = t.clientX - state.touch.x;
      const dy = t.clientY - state.touch.y;
      const book = stage.firstElementChild;
      if (!book || Math.abs(dx) <= 10 || Math.abs(dx) <= Math.abs(dy)) return;
      const p = Math.max(-0.3, Math.min(0.3, dx / window.innerWidth));
      book.style.transform = `translateX(${dx * 0.3}px) scale(${1 - Math.abs(p) * 0.05})`;
      book.style.opacity = String(1 - Math.abs(p) * 1.5);
    }, { passive: true });
    function resetDrag() {
      const book = stage.firstElementChild;
      if (book) { book.style.transform = ""; book.style.opacity = ""; }
      state.touch = null;
    }
    stage.addEventListener("touchend", (event) => {
      if (!state.touch) return;
      const t = event.changedTouches[0];
      const delta = state.touch.x - t.clientX;
      const dy = Math.abs(t.clientY - state.touch.y);
      resetDrag();
      if (Math.abs(delta) > 50 && dy < 100) turn(delta > 0 ? "next" : "prev");
    });
    stage.addEventListener("touchcancel", resetDrag);

    let resizeTimer = null;
    window.addEventListener("resize", () => {
      window.clearTimeout(resizeTimer);
      resizeTimer = window.setTimeout(relayout, 250);
    });
    relayout();
  </script>
</body>
</html>
"#;
    template
        .replace("__TITLE__", &flipbook::escape_text(title))
        .replace("__PAYLOAD__", &safe_json)
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> Result<T, String> {
    let raw = args
        .get(i + 1)
        .ok_or_else(|| format!("{flag} requires a value"))?;
    raw.parse::<T>()
        .map_err(|_| format!("invalid value for {flag}: {raw}"))
}

fn parse_args(args: Vec<String>) -> Result<Args, String> {
    if args.len() >= 2 && (args[1] == "--help" || args[1] == "-h") {
        return Err("help requested".to_string());
    }

    let has_positional_dir = args.get(1).is_some_and(|v| !v.starts_with("--"));

    let mut cfg = Args {
        content_dir: if has_positional_dir {
            args[1].clone()
        } else {
            DEFAULT_CONTENT_DIR.to_string()
        },
        out_path: DEFAULT_OUT_PATH.to_string(),
        config_path: None,
        spread_width: None,
        spread_height: None,
        single_width: None,
        single_height: None,
        words_per_page: None,
        table_of_contents: false,
    };

    let mut i = if has_positional_dir { 2usize } else { 1usize };
    while i < args.len() {
        match args[i].as_str() {
            "--out" => {
                let v = args
                    .get(i + 1)
                    .ok_or_else(|| "--out requires a value".to_string())?;
                cfg.out_path = v.clone();
                i += 2;
            }
            "--config" => {
                let v = args
                    .get(i + 1)
                    .ok_or_else(|| "--config requires a value".to_string())?;
                cfg.config_path = Some(v.clone());
                i += 2;
            }
            "--width" => {
                cfg.spread_width = Some(parse_value(&args, i, "--width")?);
                i += 2;
            }
            "--height" => {
                cfg.spread_height = Some(parse_value(&args, i, "--height")?);
                i += 2;
            }
            "--single-width" => {
                cfg.single_width = Some(parse_value(&args, i, "--single-width")?);
                i += 2;
            }
            "--single-height" => {
                cfg.single_height = Some(parse_value(&args, i, "--single-height")?);
                i += 2;
            }
            "--words-per-page" => {
                cfg.words_per_page = Some(parse_value(&args, i, "--words-per-page")?);
                i += 2;
            }
            "--toc" => {
                cfg.table_of_contents = true;
                i += 1;
            }
            "--help" | "-h" => return Err("help requested".to_string()),
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    Ok(cfg)
}

fn help_text() -> &'static str {
    r#"web-preview - standalone flipbook preview generator

USAGE:
  cargo run -p flipbook-render-web --bin web-preview -- [content_dir] [options]

Loads book-metadata.json and chapter files from content_dir (default: content),
paginates them for the single-page and spread layouts, and writes one
self-contained HTML file.

OPTIONS:
  --out <file>              output HTML path (default: target/web-preview/index.html)
  --config <file>           JSON preview config; flags below override it
  --width <px>              spread viewport width (default: 1280)
  --height <px>             spread viewport height (default: 800)
  --single-width <px>       single-page viewport width (default: 390)
  --single-height <px>      single-page viewport height (default: 780)
  --words-per-page <n>      paginate by word quota instead of measured height
  --toc                     prepend a table-of-contents page
  -h, --help                show this help

Set RUST_LOG=debug for pagination and navigation logs."#
}
