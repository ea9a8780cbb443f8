use std::fs;
use std::path::Path;

use anyhow::Context as _;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::cli::ExportArgs;
use crate::document::{PageImage, artifact_filename};
use crate::library::{Library as _, LocalFsLibrary};

pub async fn run(args: ExportArgs) -> anyhow::Result<()> {
    let library = LocalFsLibrary::new(&args.library);
    let document = library
        .get(args.id)
        .await
        .context("load document")?
        .ok_or_else(|| anyhow::anyhow!("no such document: {}", args.id))?;

    let out = args
        .out
        .unwrap_or_else(|| artifact_filename(&document.title));
    tracing::info!(id = %document.id, out, "export flipbook");
    write_to_file(Path::new(&out), &document.pages, &document.title, args.force)?;
    println!("{out}");
    Ok(())
}

const JQUERY_URL: &str = "https://code.jquery.com/jquery-3.7.1.min.js";
const TURN_JS_URL: &str = "https://cdn.jsdelivr.net/gh/blasten/turn.js/turn.min.js";

/// Storage namespace the artifact uses for its notes, derived only from the
/// title so re-generating from the same title reconnects to the same saved
/// notes. Distinct titles may collide after truncation; accepted.
pub fn note_namespace(title: &str) -> String {
    let encoded = BASE64.encode(title.as_bytes());
    let truncated = &encoded[..encoded.len().min(16)];
    format!("notes_{truncated}")
}

/// Renders the whole flipbook as one standalone HTML document. Everything it
/// needs at view time is inline except jQuery and turn.js, which it pulls
/// from public CDNs; it never calls back into this process.
///
/// Page numbering inside the artifact is 1-based; the embedded script
/// re-implements the viewer's navigation policy in those terms.
pub fn generate(pages: &[PageImage], title: &str) -> String {
    let total = pages.len();
    let namespace = note_namespace(title);

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n");
    out.push_str("<html lang=\"en\">\n");
    out.push_str("<head>\n");
    out.push_str("    <meta charset=\"UTF-8\">\n");
    out.push_str("    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no, viewport-fit=cover\">\n");
    out.push_str(&format!("    <title>{}</title>\n", html_escape(title)));
    out.push_str(&format!("    <script src=\"{JQUERY_URL}\"></script>\n"));
    out.push_str(&format!("    <script src=\"{TURN_JS_URL}\"></script>\n"));
    out.push_str("    <style>\n");
    out.push_str(ARTIFACT_STYLE);
    out.push_str("    </style>\n");
    out.push_str("</head>\n");
    out.push_str("<body>\n");
    out.push_str("    <div id=\"canvas\">\n");
    out.push_str("        <div id=\"flipbook-wrapper\">\n");
    out.push_str("            <div class=\"nav-btn prev\" id=\"p-nav\" onclick=\"goPrev(event)\">\n");
    out.push_str("                <svg fill=\"none\" stroke=\"currentColor\" viewBox=\"0 0 24 24\"><path stroke-linecap=\"round\" stroke-linejoin=\"round\" d=\"M15 19l-7-7 7-7\"/></svg>\n");
    out.push_str("            </div>\n");
    out.push_str("            <div id=\"flipbook\">\n");
    for (i, page) in pages.iter().enumerate() {
        out.push_str("                <div class=\"page-node\">\n");
        out.push_str("                    <div class=\"page-inner\">\n");
        // An unusable reference keeps its slot as an empty node so the
        // 1-based numbering never shifts.
        if page.is_usable() {
            out.push_str(&format!(
                "                        <img src=\"{}\" alt=\"Page {}\" />\n",
                html_escape(page.as_str()),
                i + 1
            ));
        }
        out.push_str("                    </div>\n");
        out.push_str("                </div>\n");
    }
    out.push_str("            </div>\n");
    out.push_str("            <div class=\"nav-btn next\" id=\"n-nav\" onclick=\"goNext(event)\">\n");
    out.push_str("                <svg fill=\"none\" stroke=\"currentColor\" viewBox=\"0 0 24 24\"><path stroke-linecap=\"round\" stroke-linejoin=\"round\" d=\"M9 5l7 7-7 7\"/></svg>\n");
    out.push_str("            </div>\n");
    out.push_str("        </div>\n");
    out.push_str("    </div>\n");
    out.push_str("    <div id=\"thumbs-strip\">\n");
    for (i, page) in pages.iter().enumerate() {
        out.push_str(&format!(
            "        <button class=\"thumb-btn\" data-page=\"{}\" onclick=\"jumpToPage({})\">\n",
            i + 1,
            i + 1
        ));
        if page.is_usable() {
            out.push_str(&format!(
                "            <img src=\"{}\" />\n",
                html_escape(page.as_str())
            ));
        }
        out.push_str("        </button>\n");
    }
    out.push_str("    </div>\n");
    out.push_str(ARTIFACT_PANEL_PREFIX);
    out.push_str(&format!(
        "        <div class=\"info\"><span id=\"pg\">1</span> / {total}</div>\n"
    ));
    out.push_str(&format!(
        "        <input type=\"range\" min=\"1\" max=\"{total}\" value=\"1\" id=\"page-slider\" class=\"slider-ctrl\" oninput=\"jumpToPage(this.value)\">\n"
    ));
    out.push_str(ARTIFACT_PANEL_SUFFIX);
    out.push_str("    <script>\n");
    out.push_str(&format!("        var TOTAL = {total};\n"));
    out.push_str(&format!("        var noteKey = \"{namespace}\";\n"));
    out.push_str(ARTIFACT_SCRIPT);
    out.push_str("    </script>\n");
    out.push_str("</body>\n");
    out.push_str("</html>\n");
    out
}

/// Writes the artifact next to wherever the caller points, refusing to
/// clobber an existing file unless forced.
pub fn write_to_file(
    out_path: &Path,
    pages: &[PageImage],
    title: &str,
    force: bool,
) -> anyhow::Result<()> {
    if out_path.exists() && !force {
        anyhow::bail!("export output already exists: {}", out_path.display());
    }
    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create export parent dir: {}", parent.display()))?;
    }
    let html = generate(pages, title);
    fs::write(out_path, html)
        .with_context(|| format!("write export artifact: {}", out_path.display()))?;
    Ok(())
}

fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const ARTIFACT_STYLE: &str = r#"        :root {
            --bg-deep: #060913;
            --nav-bg: rgba(255, 255, 255, 0.08);
            --nav-hover: rgba(255, 255, 255, 0.15);
            --accent: #6366f1;
            --panel-bg: rgba(0, 0, 0, 0.6);
            --text-dim: #94a3b8;
        }
        * { box-sizing: border-box; -webkit-tap-highlight-color: transparent; }
        body, html {
            margin: 0; padding: 0; width: 100%; height: 100%;
            background: var(--bg-deep); overflow: hidden;
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
        }
        #canvas {
            width: 100%; height: 100%;
            display: flex; align-items: center; justify-content: center;
            background: var(--bg-deep); position: relative;
        }
        #flipbook-wrapper {
            width: 100%; height: 100%;
            display: flex; align-items: center; justify-content: center;
            position: relative;
        }
        #flipbook { box-shadow: 0 50px 100px rgba(0,0,0,0.9); background: #000; visibility: hidden; }
        .page-node { background-color: #000; width: 100%; height: 100%; }
        .page-inner {
            width: 100%; height: 100%;
            display: flex; align-items: center; justify-content: center;
            background: #000; position: relative;
        }
        .page-inner img {
            max-width: 100%; max-height: 100%;
            object-fit: contain; display: block; pointer-events: none;
        }
        .nav-btn {
            position: absolute; top: 50%; transform: translateY(-50%);
            width: 70px; height: 70px;
            background: var(--nav-bg); backdrop-filter: blur(20px);
            border-radius: 50%; border: 1px solid rgba(255, 255, 255, 0.1);
            display: flex; align-items: center; justify-content: center;
            color: white; cursor: pointer; z-index: 1000;
            transition: all 0.3s; user-select: none; opacity: 0;
        }
        body:hover .nav-btn { opacity: 1; }
        .nav-btn:hover { background: var(--nav-hover); transform: translateY(-50%) scale(1.05); }
        .nav-btn.prev { left: 40px; }
        .nav-btn.next { right: 40px; }
        .nav-btn svg { width: 32px; height: 32px; stroke-width: 2.5; }
        .panel {
            position: fixed; bottom: 30px; left: 50%; transform: translateX(-50%);
            background: var(--panel-bg); backdrop-filter: blur(30px);
            padding: 10px 24px; border-radius: 50px;
            display: flex; align-items: center; gap: 16px;
            border: 1px solid rgba(255,255,255,0.08); z-index: 2000;
        }
        .info { color: white; font-weight: 800; font-size: 13px; min-width: 80px; text-align: center; font-variant-numeric: tabular-nums; }
        .btn {
            background: transparent; border: none; color: var(--text-dim);
            width: 38px; height: 38px; border-radius: 12px;
            display: flex; align-items: center; justify-content: center;
            cursor: pointer; transition: all 0.2s;
        }
        .btn:hover { background: rgba(255,255,255,0.1); color: white; }
        .btn.active { background: var(--accent); color: white; }
        .btn svg { width: 20px; height: 20px; }
        .slider-ctrl { width: 120px; accent-color: var(--accent); cursor: pointer; height: 4px; }
        #thumbs-strip {
            position: fixed; bottom: 0; left: 0; right: 0;
            background: rgba(0,0,0,0.9); backdrop-filter: blur(40px);
            padding: 20px 40px; transform: translateY(100%);
            transition: transform 0.5s;
            display: flex; gap: 15px; overflow-x: auto; z-index: 3000;
            border-top: 1px solid rgba(255,255,255,0.1);
            scrollbar-width: none;
        }
        #thumbs-strip.visible { transform: translateY(0); }
        .thumb-btn {
            flex: 0 0 100px; height: 140px; border-radius: 12px;
            overflow: hidden; border: 2px solid transparent;
            cursor: pointer; transition: all 0.3s; opacity: 0.5;
            background: #111; padding: 0;
        }
        .thumb-btn img { width: 100%; height: 100%; object-fit: cover; }
        .thumb-btn.active { border-color: var(--accent); opacity: 1; }
        .note-btn {
            position: absolute; top: 12%; z-index: 100;
            background: #facc15; border: none; width: 34px; height: 34px; border-radius: 50%;
            cursor: pointer; box-shadow: 0 10px 20px rgba(0,0,0,0.3);
            display: flex; align-items: center; justify-content: center; font-weight: bold;
        }
        .note-btn.has-content { background: #fbbf24; }
        .note-modal {
            position: fixed; inset: 0; background: rgba(0,0,0,0.8);
            backdrop-filter: blur(5px); z-index: 5000;
            display: none; align-items: center; justify-content: center;
        }
        .note-modal.visible { display: flex; }
        .note-card {
            background: #fef9c3; padding: 30px; border-radius: 30px;
            width: 340px; position: relative;
        }
        .note-card textarea {
            width: 100%; height: 180px; background: transparent;
            border: none; outline: none; font-size: 16px; color: #713f12;
            font-family: inherit; resize: none;
        }
        @media (max-width: 900px) {
            .nav-btn { display: none; }
            .panel { width: 95%; gap: 8px; bottom: 20px; padding: 8px 16px; }
            .slider-ctrl { display: none; }
        }
"#;

const ARTIFACT_PANEL_PREFIX: &str = r#"    <div class="panel">
        <button class="btn" id="s-btn" title="Single Page" onclick="setMode('single', event)">
            <svg fill="none" stroke="currentColor" viewBox="0 0 24 24"><path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="M4 6h16M4 12h16M4 18h16"/></svg>
        </button>
        <button class="btn active" id="d-btn" title="Double Spread" onclick="setMode('double', event)">
            <svg fill="none" stroke="currentColor" viewBox="0 0 24 24"><path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="M3 7h18M3 12h18M3 17h18"/></svg>
        </button>
"#;

const ARTIFACT_PANEL_SUFFIX: &str = r#"        <button class="btn" id="a-btn" title="Auto Play" onclick="toggleAuto(event)">
            <svg fill="none" stroke="currentColor" viewBox="0 0 24 24"><path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="M14.752 11.168l-3.197-2.132A1 1 0 0010 9.87v4.263a1 1 0 001.555.832l3.197-2.132a1 1 0 000-1.664z"/></svg>
        </button>
        <button class="btn" id="t-btn" title="Thumbnails" onclick="toggleThumbs(event)">
            <svg fill="none" stroke="currentColor" viewBox="0 0 24 24"><path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="M4 6a2 2 0 012-2h2a2 2 0 012 2v2a2 2 0 01-2 2H6a2 2 0 01-2-2V6zM14 6a2 2 0 012-2h2a2 2 0 012 2v2a2 2 0 01-2 2h-2a2 2 0 01-2-2V6zM4 16a2 2 0 012-2h2a2 2 0 012 2v2a2 2 0 01-2 2H6a2 2 0 01-2-2v-2zM14 16a2 2 0 012-2h2a2 2 0 012 2v2a2 2 0 01-2 2h-2a2 2 0 01-2-2v-2z"/></svg>
        </button>
        <button class="btn" title="Fullscreen" onclick="toggleFs()">
            <svg fill="none" stroke="currentColor" viewBox="0 0 24 24"><path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="M4 8V4m0 0h4M4 4l5 5m11-1V4m0 0h-4m4 0l-5 5M4 16v4m0 0h4m-4 0l5-5m11 5l-5-5m5 5v-4m0 4h-4"/></svg>
        </button>
    </div>
    <div class="note-modal" id="note-modal">
        <div class="note-card">
            <textarea id="note-text" placeholder="Type your notes here..."></textarea>
            <div style="font-size: 10px; color: #a16207; opacity: 0.6; margin-top: 10px; text-transform: uppercase;">Saved Locally</div>
        </div>
    </div>
"#;

// Navigation below is deliberately self-contained: page targets are computed
// here (1-based) and handed to turn.js only for rendering, so the artifact
// behaves the same as the live viewer regardless of library defaults.
const ARTIFACT_SCRIPT: &str = r#"        var book = $('#flipbook');
        var autoInt = null;
        var notes = JSON.parse(localStorage.getItem(noteKey) || "{}");
        var activeNotePage = null;

        function isDouble() { return book.turn('display') === 'double'; }
        function stepSize() { return (isDouble() && TOTAL > 1) ? 2 : 1; }

        function nextPage(p) {
            if (isDouble() && TOTAL > 1) {
                if (p + 2 <= TOTAL) return p + 2;
                if (p + 1 <= TOTAL) return p + 1;
                return p;
            }
            return (p + 1 <= TOTAL) ? p + 1 : p;
        }

        function prevPage(p) {
            if (isDouble() && TOTAL > 1) { return (p >= 3) ? p - 2 : 1; }
            return (p > 1) ? p - 1 : 1;
        }

        function snapPage(p) {
            if (TOTAL === 0) return 1;
            p = Math.max(1, Math.min(TOTAL, p));
            if (isDouble() && TOTAL > 1 && p % 2 === 0) p -= 1;
            return p;
        }

        function canGoNext() { return book.turn('page') + stepSize() <= TOTAL; }

        function goNext(e) { if (e) e.stopPropagation(); book.turn('page', nextPage(book.turn('page'))); }
        function goPrev(e) { if (e) e.stopPropagation(); book.turn('page', prevPage(book.turn('page'))); }
        function jumpToPage(p) { book.turn('page', snapPage(parseInt(p, 10))); }

        function toggleFs() {
            if (!document.fullscreenElement) document.documentElement.requestFullscreen();
            else document.exitFullscreen();
        }

        function toggleAuto(e) {
            if (e) e.stopPropagation();
            if (autoInt) {
                clearInterval(autoInt); autoInt = null; $('#a-btn').removeClass('active');
            } else {
                $('#a-btn').addClass('active');
                autoInt = setInterval(function() {
                    if (!canGoNext()) { toggleAuto(); }
                    else { goNext(); }
                }, 3500);
            }
        }

        function toggleThumbs(e) {
            if (e) e.stopPropagation();
            $('#thumbs-strip').toggleClass('visible');
            $('#t-btn').toggleClass('active');
        }

        function setMode(m, e) {
            if (e) e.stopPropagation();
            book.turn('display', m);
            $('#s-btn, #d-btn').removeClass('active');
            if (m === 'single') { $('#s-btn').addClass('active'); $('#flipbook').removeClass('double'); }
            else { $('#d-btn').addClass('active'); $('#flipbook').addClass('double'); }
            jumpToPage(book.turn('page'));
            handleResize();
        }

        function handleResize() {
            var w = $(window).width();
            var h = $(window).height();
            var ratio = isDouble() ? 1.414 : 0.707;
            var targetH = h * 0.82;
            var targetW = targetH * ratio;
            if (targetW > w * 0.9) { targetW = w * 0.9; targetH = targetW / ratio; }
            book.turn('size', targetW, targetH);
            updateNavVisibility();
            updateNoteButtons();
        }

        function updateNavVisibility() {
            var page = book.turn('page');
            $('#p-nav').css('opacity', page === 1 ? '0.1' : '1');
            $('#n-nav').css('opacity', canGoNext() ? '1' : '0.1');
            $('#pg').text(page);
            $('#page-slider').val(page);
            $('.thumb-btn').removeClass('active');
            $('.thumb-btn[data-page="' + page + '"]').addClass('active');
        }

        function openNote(p, e) {
            if (e) e.stopPropagation();
            activeNotePage = p;
            $('#note-text').val(notes[p] || "");
            $('#note-modal').addClass('visible');
        }

        function closeNote() {
            if (activeNotePage !== null) {
                var text = $('#note-text').val();
                if (text !== "" || notes[activeNotePage] !== undefined) {
                    notes[activeNotePage] = text;
                    localStorage.setItem(noteKey, JSON.stringify(notes));
                }
                activeNotePage = null;
            }
            $('#note-modal').removeClass('visible');
            updateNoteButtons();
        }

        function updateNoteButtons() {
            $('.note-btn').remove();
            var currentPage = book.turn('page');
            $('.page-node').each(function(i) {
                var p = i + 1;
                if (p === currentPage || (isDouble() && (p === currentPage + 1 || p === currentPage - 1))) {
                    var side = (p % 2 === 0) ? 'right' : 'left';
                    var hasNote = !!notes[p];
                    var btn = $('<button class="note-btn">' + (hasNote ? '!' : '+') + '</button>');
                    btn.css(side, '12%');
                    btn.click(function(e) { openNote(p, e); });
                    if (hasNote) btn.addClass('has-content');
                    $(this).find('.page-inner').append(btn);
                }
            });
        }

        $(window).ready(function() {
            var startDisplay = ($(window).width() > 900) ? 'double' : 'single';
            if (startDisplay === 'single') { $('#d-btn').removeClass('active'); $('#s-btn').addClass('active'); }
            else { $('#flipbook').addClass('double'); }
            book.turn({
                display: startDisplay,
                acceleration: true,
                duration: 1100,
                autoCenter: true,
                when: {
                    turned: function() {
                        updateNavVisibility();
                        updateNoteButtons();
                    }
                }
            });
            book.css('visibility', 'visible');
            $(window).resize(handleResize);
            handleResize();
            $(window).click(function() { if ($('#note-modal').hasClass('visible')) closeNote(); });
            $('.note-card').click(function(e) { e.stopPropagation(); });
            $(window).keydown(function(e) {
                if (e.keyCode == 37) goPrev();
                if (e.keyCode == 39) goNext();
            });
        });
"#;
