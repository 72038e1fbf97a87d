use std::fmt;

use actix_web::http::StatusCode;
use chrono::NaiveDate;

use crate::{
    api::rest::RecordForm,
    model::{
        config::PresenterConfig,
        models::{Gender, RecordTable},
    },
};

/**
 * Name of the downloaded ledger file.
 */
pub const EXPORT_FILE_NAME: &str = "防返贫监测台账_导出.csv";

const STYLE: &str = "body{font-family:sans-serif;margin:0;display:flex;color:#262730}\
aside{width:16rem;min-height:100vh;background:#f0f2f6;padding:1.5rem;box-sizing:border-box}\
main{flex:1;max-width:46rem;margin:0 auto;padding:2rem}\
.info{background:#e8f0fe;color:#1c4f9c;padding:.75rem 1rem;border-radius:.5rem}\
.success{background:#e6f4ea;color:#1e6b34;padding:.75rem 1rem;border-radius:.5rem}\
.error{background:#fdecea;color:#a1261b;padding:.75rem 1rem;border-radius:.5rem}\
.big-font{font-size:18px;color:#555}\
.columns{display:grid;grid-template-columns:1fr 1fr;gap:1rem}\
label{display:block;margin:.5rem 0}\
input,select,textarea{width:100%;box-sizing:border-box;padding:.4rem}\
table{border-collapse:collapse;width:100%}\
th,td{border:1px solid #ddd;padding:.3rem .5rem;text-align:left;white-space:pre-wrap}\
.caption{color:#888}";

/**
 * Outcome of a submission, shown above the form.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/**
 * Everything needed to render the entry page.
 */
pub struct LedgerPage<'a> {
    pub presenter: &'a PresenterConfig,
    pub form: &'a RecordForm,
    pub notice: Option<&'a Notice>,
    pub table: &'a RecordTable,
    pub today: NaiveDate,
}

impl fmt::Display for LedgerPage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<!DOCTYPE html><html lang=\"zh-CN\"><head><meta charset=\"utf-8\"><title>防返贫监测数据录入系统 - {}</title><style>{STYLE}</style></head><body>", Escaped(&self.presenter.developer))?;
        self.fmt_sidebar(f)?;
        f.write_str("<main><h1>📋 防返贫监测对象信息录入台账</h1>")?;
        write!(f, "<p class=\"big-font\"><b>系统开发/台账负责人：{}</b></p><hr>", Escaped(&self.presenter.developer))?;
        write!(f, "<h3>数字化信息采集入口（{}）</h3>", Escaped(&self.presenter.village))?;
        f.write_str("<p class=\"info\">说明：请输入农户的具体信息，点击提交后系统将自动汇总。</p>")?;
        match self.notice {
            Some(Notice::Success(message)) => write!(f, "<p class=\"success\">{}</p>", Escaped(message))?,
            Some(Notice::Error(message)) => write!(f, "<p class=\"error\">{}</p>", Escaped(message))?,
            None => {}
        }
        self.fmt_form(f)?;
        f.write_str("<hr><h2>📊 实时台账预览</h2>")?;
        self.fmt_table(f)?;
        f.write_str("</main></body></html>")
    }
}

impl LedgerPage<'_> {
    fn fmt_sidebar(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<aside><h2>系统管理面板</h2><p class=\"info\">当前管理员：<b>{}</b></p><p>所属区域：<b>{}</b></p><p>当前日期：{}</p></aside>",
            Escaped(&self.presenter.administrator),
            Escaped(&self.presenter.region),
            self.today.format("%Y-%m-%d")
        )
    }

    fn fmt_form(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("<form method=\"post\" action=\"/\"><div class=\"columns\"><div>")?;
        write!(f, "<label>姓名<input type=\"text\" name=\"name\" placeholder=\"请输入户主姓名\" value=\"{}\"></label>", Escaped(&self.form.name))?;
        write!(f, "<label>月收入 (元)<input type=\"number\" name=\"monthly_income\" min=\"0\" step=\"100\" value=\"{}\"></label>", Escaped(&self.form.monthly_income))?;
        f.write_str("</div><div><label>性别<select name=\"gender\">")?;
        for gender in Gender::ALL {
            let selected = if self.form.gender == gender.label() { " selected" } else { "" };
            write!(f, "<option value=\"{gender}\"{selected}>{gender}</option>")?;
        }
        f.write_str("</select></label>")?;
        write!(f, "<label>家庭人口 (人)<input type=\"number\" name=\"family_size\" min=\"1\" step=\"1\" value=\"{}\"></label>", Escaped(&self.form.family_size))?;
        f.write_str("</div></div>")?;
        write!(f, "<label>风险点 (主要致贫/返贫原因)<textarea name=\"risk_factor\" rows=\"3\" placeholder=\"例如：因病、缺少劳动力、自然灾害等\">\n{}</textarea></label>", Escaped(&self.form.risk_factor))?;
        f.write_str("<button type=\"submit\">✅ 提交录入</button></form>")
    }

    fn fmt_table(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.table.is_empty() {
            return f.write_str("<p class=\"caption\">暂无数据，请在上方录入。</p>");
        }
        f.write_str("<table><thead><tr>")?;
        for header in self.table.headers() {
            write!(f, "<th>{header}</th>")?;
        }
        f.write_str("</tr></thead><tbody>")?;
        for record in self.table.rows() {
            write!(
                f,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                Escaped(&record.name),
                record.gender,
                record.monthly_income,
                Escaped(&record.risk_factor),
                record.family_size,
                record.recorded_at_text()
            )?;
        }
        f.write_str("</tbody></table>")?;
        write!(f, "<p><a href=\"/export\" download=\"{EXPORT_FILE_NAME}\">📥 导出完整台账 (CSV/Excel)</a></p>")
    }
}

/**
 * Renders the page shown for errors that abort a request.
 *
 * # Arguments
 * `status`: HTTP status of the response.
 * `code`: Application error code.
 * `message`: Error message.
 */
pub fn render_error_page(status: StatusCode, code: u16, message: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"zh-CN\"><head><meta charset=\"utf-8\"><title>{status}</title><style>{STYLE}</style></head><body><main><h1>⚠️ 系统错误</h1><p class=\"error\">{} (错误代码 {code})</p><p><a href=\"/\">返回录入页面</a></p></main></body></html>",
        Escaped(message)
    )
}

/**
 * Displays text with HTML special characters escaped.
 */
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut rest = self.0;
        while let Some(index) = rest.find(['&', '<', '>', '"', '\'']) {
            f.write_str(&rest[..index])?;
            let entity = match rest.as_bytes()[index] {
                b'&' => "&amp;",
                b'<' => "&lt;",
                b'>' => "&gt;",
                b'"' => "&quot;",
                _ => "&#39;",
            };
            f.write_str(entity)?;
            rest = &rest[index + 1..];
        }
        f.write_str(rest)
    }
}
