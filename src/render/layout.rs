use chrono::{Datelike, NaiveDate};

use crate::config::StatementOptions;
use crate::decimal::Money;
use crate::types::{Client, Installment, Loan};

/// A4 portrait in points
const PAGE_WIDTH: f64 = 595.28;
const PAGE_HEIGHT: f64 = 841.89;
const PAGE_MARGIN: f64 = 40.0;

const TITLE_SIZE: f64 = 16.0;
const BODY_SIZE: f64 = 10.0;
const ROW_HEIGHT: f64 = 18.0;
/// vertical advance of one header-block body line
const INFO_LINE_HEIGHT: f64 = 14.0;

/// fixed widths of the first five table columns; the sixth takes the
/// remainder so the table spans the content width exactly
const FIXED_COLUMN_WIDTHS: [f64; 5] = [50.0, 90.0, 95.0, 90.0, 90.0];

/// materialized statement input: one loan, its owner, its schedule
#[derive(Debug, Clone)]
pub struct StatementData {
    pub client: Client,
    pub loan: Loan,
    pub installments: Vec<Installment>,
}

/// horizontal cell alignment within its box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// one positioned piece of text; `x`/`width` describe the box the text is
/// aligned within, `y` is the distance from the top of the page
#[derive(Debug, Clone, PartialEq)]
pub struct TextCell {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub size: f64,
    pub bold: bool,
    pub align: Align,
    pub text: String,
}

/// horizontal rule
#[derive(Debug, Clone, PartialEq)]
pub struct RuleLine {
    pub x: f64,
    pub y: f64,
    pub width: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub cells: Vec<TextCell>,
    pub rules: Vec<RuleLine>,
}

/// page-described statement document
#[derive(Debug, Clone, PartialEq)]
pub struct StatementDocument {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    pub pages: Vec<Page>,
}

impl StatementDocument {
    pub fn content_width(&self) -> f64 {
        self.page_width - 2.0 * self.margin
    }
}

struct ColumnSpec {
    title: String,
    width: f64,
    align: Align,
}

/// lays a statement out into a paginated document
///
/// Single forward pass over the installments; the vertical cursor is the
/// only state. The header block appears on the first page only, the column
/// header row on every page.
#[derive(Debug, Clone, Default)]
pub struct ScheduleTableRenderer {
    options: StatementOptions,
}

impl ScheduleTableRenderer {
    pub fn new(options: StatementOptions) -> Self {
        Self { options }
    }

    pub fn render(&self, data: &StatementData) -> StatementDocument {
        let content_width = PAGE_WIDTH - 2.0 * PAGE_MARGIN;
        let columns = self.columns(content_width);
        let bottom = PAGE_HEIGHT - PAGE_MARGIN;

        let mut pages = vec![Page::default()];
        let mut y = PAGE_MARGIN;

        self.draw_header_block(pages.last_mut().expect("page exists"), data, content_width, &mut y);
        draw_column_header(pages.last_mut().expect("page exists"), &columns, content_width, &mut y);

        for installment in &data.installments {
            if y + ROW_HEIGHT > bottom {
                pages.push(Page::default());
                y = PAGE_MARGIN;
                draw_column_header(
                    pages.last_mut().expect("page exists"),
                    &columns,
                    content_width,
                    &mut y,
                );
            }
            self.draw_row(pages.last_mut().expect("page exists"), &columns, installment, &mut y);
        }

        StatementDocument {
            page_width: PAGE_WIDTH,
            page_height: PAGE_HEIGHT,
            margin: PAGE_MARGIN,
            pages,
        }
    }

    fn columns(&self, content_width: f64) -> Vec<ColumnSpec> {
        let fixed: f64 = FIXED_COLUMN_WIDTHS.iter().sum();
        vec![
            ColumnSpec {
                title: "No.".to_string(),
                width: FIXED_COLUMN_WIDTHS[0],
                align: Align::Left,
            },
            ColumnSpec {
                title: "Due Date".to_string(),
                width: FIXED_COLUMN_WIDTHS[1],
                align: Align::Left,
            },
            ColumnSpec {
                title: format!("Installment ({})", self.options.currency_prefix),
                width: FIXED_COLUMN_WIDTHS[2],
                align: Align::Right,
            },
            ColumnSpec {
                title: "Interest".to_string(),
                width: FIXED_COLUMN_WIDTHS[3],
                align: Align::Right,
            },
            ColumnSpec {
                title: "Principal".to_string(),
                width: FIXED_COLUMN_WIDTHS[4],
                align: Align::Right,
            },
            ColumnSpec {
                title: "Balance".to_string(),
                width: content_width - fixed,
                align: Align::Right,
            },
        ]
    }

    fn draw_header_block(
        &self,
        page: &mut Page,
        data: &StatementData,
        content_width: f64,
        y: &mut f64,
    ) {
        page.cells.push(TextCell {
            x: PAGE_MARGIN,
            y: *y,
            width: content_width,
            size: TITLE_SIZE,
            bold: false,
            align: Align::Center,
            text: self.options.title.clone(),
        });
        *y += TITLE_SIZE + 8.0;
        *y += 10.0;

        let total_to_pay: Money = data
            .installments
            .iter()
            .map(|i| i.installment_amount)
            .sum();

        let lines = [
            format!(
                "Client: {} (ID: {})",
                data.client.full_name(),
                data.client.national_id
            ),
            format!(
                "Loan: Amount {} | Annual rate {} | Term {} months",
                self.currency(data.loan.principal),
                fmt_percent(data.loan.interest_rate),
                data.loan.term_count
            ),
            format!("Total to pay: {}", self.currency(total_to_pay)),
            format!("Start date: {}", fmt_date(data.loan.start_date)),
        ];
        for line in lines {
            page.cells.push(TextCell {
                x: PAGE_MARGIN,
                y: *y,
                width: content_width,
                size: BODY_SIZE,
                bold: false,
                align: Align::Left,
                text: line,
            });
            *y += INFO_LINE_HEIGHT;
        }
        *y += 6.0;
    }

    fn draw_row(
        &self,
        page: &mut Page,
        columns: &[ColumnSpec],
        installment: &Installment,
        y: &mut f64,
    ) {
        let values = [
            installment.installment_number.to_string(),
            fmt_date(installment.due_date),
            self.currency(installment.installment_amount),
            self.currency(installment.interest_amount),
            self.currency(installment.principal_amount),
            self.currency(installment.remaining_balance),
        ];
        let mut x = PAGE_MARGIN;
        for (column, value) in columns.iter().zip(values) {
            page.cells.push(TextCell {
                x,
                y: *y,
                width: column.width,
                size: BODY_SIZE,
                bold: false,
                align: column.align,
                text: value,
            });
            x += column.width;
        }
        *y += ROW_HEIGHT;
    }

    fn currency(&self, amount: Money) -> String {
        format!("{} {}", self.options.currency_prefix, amount)
    }
}

fn draw_column_header(page: &mut Page, columns: &[ColumnSpec], content_width: f64, y: &mut f64) {
    let mut x = PAGE_MARGIN;
    for column in columns {
        page.cells.push(TextCell {
            x,
            y: *y,
            width: column.width,
            size: BODY_SIZE,
            bold: true,
            align: column.align,
            text: column.title.clone(),
        });
        x += column.width;
    }
    *y += ROW_HEIGHT - 6.0;
    page.rules.push(RuleLine {
        x: PAGE_MARGIN,
        y: *y,
        width: content_width,
    });
    *y += 6.0;
}

fn fmt_date(date: NaiveDate) -> String {
    format!("{:02}/{:02}/{}", date.day(), date.month(), date.year())
}

fn fmt_percent(rate: crate::decimal::Rate) -> String {
    let mut pct = rate.as_percentage();
    pct.rescale(2);
    format!("{}%", pct)
}
