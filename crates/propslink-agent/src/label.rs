// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ZPL label rendering.
//
// Each template name maps to a fixed layout.  Asset labels carry the asset
// name, category, optional site/department line, a Code 128 barcode and a QR
// code.  Location labels (jobs with a location name) swap the asset lines for
// the location's name, description, categories and departments.  Printed at
// 203 dpi.

use propslink_core::error::JobError;
use propslink_core::types::JobRequest;

/// Space reserved for the QR code, in dots.
const QR_BOX: u32 = 120;

/// Physical label layouts, in dots at 203 dpi.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelLayout {
    /// 2in x 2in.
    Square,
    /// 4in x 2in.
    Wide,
}

impl LabelLayout {
    /// Resolve a template name (case-insensitive).
    pub fn from_template(name: &str) -> Result<Self, JobError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "square" => Ok(Self::Square),
            "wide" | "rectangle" => Ok(Self::Wide),
            other => Err(JobError::Render(format!("unknown label template '{other}'"))),
        }
    }

    fn size(self) -> (u32, u32) {
        match self {
            Self::Square => (406, 406),
            Self::Wide => (812, 406),
        }
    }
}

/// Render `job` with the named template.
pub fn render(template: &str, job: &JobRequest) -> Result<Vec<u8>, JobError> {
    if job.barcode.trim().is_empty() {
        return Err(JobError::Render("barcode is empty".into()));
    }
    let layout = LabelLayout::from_template(template)?;
    let (width, height) = layout.size();

    let mut zpl = Zpl::start(width, height);
    let mut lines: Vec<(u32, String)> = Vec::new();
    match &job.location_name {
        Some(location) => {
            lines.push((30, location.clone()));
            lines.extend(job.location_description.iter().map(|d| (20, d.clone())));
            lines.extend(job.location_categories.iter().map(|c| (20, c.clone())));
            lines.extend(job.location_departments.iter().map(|d| (20, d.clone())));
        }
        None => {
            lines.push((30, job.asset_name.clone()));
            lines.push((22, job.category_name.clone()));
            let origin: Vec<&str> = [&job.site_short_name, &job.department_name]
                .into_iter()
                .filter_map(|s| s.as_deref())
                .filter(|s| !s.is_empty())
                .collect();
            if !origin.is_empty() {
                lines.push((20, origin.join(" / ")));
            }
        }
    }

    let mut y = 16;
    for (size, text) in lines.iter().filter(|(_, t)| !t.is_empty()) {
        zpl.text(16, y, *size, text);
        y += size + 8;
    }

    match layout {
        LabelLayout::Square => {
            zpl.barcode(16, y + 8, 70, &job.barcode);
            zpl.qr(width - QR_BOX, height - QR_BOX, job.qr_payload());
        }
        LabelLayout::Wide => {
            zpl.barcode(16, height - 110, 80, &job.barcode);
            zpl.qr(width - 2 * QR_BOX, 16, job.qr_payload());
        }
    }

    Ok(zpl.finish(job.quantity.max(1)))
}

/// Minimal ZPL II writer.  All field data goes through `^FH` hex escaping.
struct Zpl(String);

impl Zpl {
    fn start(width: u32, height: u32) -> Self {
        Self(format!("^XA\n^CI28\n^PW{width}\n^LL{height}\n"))
    }

    fn text(&mut self, x: u32, y: u32, size: u32, text: &str) {
        self.0
            .push_str(&format!("^FO{x},{y}^A0N,{size},{size}^FH^FD{}^FS\n", escape(text)));
    }

    fn barcode(&mut self, x: u32, y: u32, height: u32, data: &str) {
        self.0
            .push_str(&format!("^FO{x},{y}^BY2^BCN,{height},Y,N,N^FH^FD{}^FS\n", escape(data)));
    }

    fn qr(&mut self, x: u32, y: u32, data: &str) {
        self.0
            .push_str(&format!("^FO{x},{y}^BQN,2,4^FH^FDQA,{}^FS\n", escape(data)));
    }

    fn finish(mut self, quantity: u32) -> Vec<u8> {
        self.0.push_str(&format!("^PQ{quantity}\n^XZ\n"));
        self.0.into_bytes()
    }
}

/// Escape ZPL control characters for a `^FH`-prefixed field.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '_' => out.push_str("_5F"),
            '^' => out.push_str("_5E"),
            '~' => out.push_str("_7E"),
            '\n' | '\r' => out.push(' '),
            c => out.push(c),
        }
    }
    out
}
