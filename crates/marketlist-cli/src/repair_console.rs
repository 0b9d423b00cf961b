use marketlist_core::repair::{RepairRequest, RepairResponse, SelectorRepairPort};
use std::cell::RefCell;
use std::io::{BufRead, Write};

/// Interactive repair prompt on a terminal.
///
/// Answers: a selector to retry with, `skip` (optional steps only), `next`
/// or an empty line to give up on the step, `quit` to stop the run. End of
/// input declines, so a closed stdin never blocks a run.
pub struct ConsoleRepair<R, W> {
    input: RefCell<R>,
    output: RefCell<W>,
}

impl ConsoleRepair<std::io::StdinLock<'static>, std::io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> ConsoleRepair<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
        }
    }

    fn prompt(&self, request: &RepairRequest) -> std::io::Result<()> {
        let mut out = self.output.borrow_mut();
        writeln!(out)?;
        writeln!(
            out,
            "== selector repair: {} ({}) ==",
            request.element_key, request.description
        )?;
        writeln!(
            out,
            "   {}/{}  browser {}  sku {}  action {}{}",
            request.region,
            request.category,
            request.browser_id,
            request.sku,
            request.action.as_str(),
            if request.mandatory { "" } else { "  (optional)" }
        )?;
        if let Some(url) = &request.page_url {
            writeln!(out, "   page: {url}")?;
        }
        for tried in &request.tried {
            writeln!(out, "   tried: {tried}")?;
        }
        if let Some(err) = &request.last_error {
            writeln!(out, "   last error: {err}")?;
        }
        if let Some(rejected) = &request.rejected {
            writeln!(out, "   rejected: {rejected}")?;
        }
        let skip = if request.mandatory { "" } else { ", 'skip'" };
        write!(out, "new selector ('next' to give up{skip}, 'quit' to stop): ")?;
        out.flush()
    }
}

impl<R: BufRead, W: Write> SelectorRepairPort for ConsoleRepair<R, W> {
    fn request(&self, request: &RepairRequest) -> RepairResponse {
        if let Err(e) = self.prompt(request) {
            tracing::warn!(error = %e, "could not write repair prompt, declining");
            return RepairResponse::Decline;
        }
        let mut line = String::new();
        match self.input.borrow_mut().read_line(&mut line) {
            Ok(0) | Err(_) => RepairResponse::Decline,
            Ok(_) => parse_answer(&line),
        }
    }
}

fn parse_answer(line: &str) -> RepairResponse {
    let answer = line.trim();
    match answer.to_ascii_lowercase().as_str() {
        "" | "next" | "n" => RepairResponse::Decline,
        "skip" | "s" => RepairResponse::Skip,
        "quit" | "q" => RepairResponse::Abort,
        _ => RepairResponse::Replace(answer.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketlist_core::types::ActionKind;
    use std::io::Cursor;

    fn request(mandatory: bool) -> RepairRequest {
        RepairRequest {
            element_key: "basic_elements.sell_button".into(),
            description: "Sell button on the home page".into(),
            action: ActionKind::Click,
            mandatory,
            region: "SG".into(),
            category: "sneakers".into(),
            browser_id: "12".into(),
            sku: "AJ1-001".into(),
            tried: vec!["#sell".into(), ".sell".into()],
            last_error: Some("timed out".into()),
            page_url: Some("https://www.carousell.sg".into()),
            rejected: None,
        }
    }

    fn answer(input: &str, mandatory: bool) -> (RepairResponse, String) {
        let console = ConsoleRepair::new(Cursor::new(input.to_string()), Vec::new());
        let response = console.request(&request(mandatory));
        let shown = String::from_utf8(console.output.into_inner()).unwrap();
        (response, shown)
    }

    #[test]
    fn selector_answer_replaces() {
        let (response, shown) = answer("  button[data-testid='sell']  \n", true);
        assert_eq!(
            response,
            RepairResponse::Replace("button[data-testid='sell']".into())
        );
        assert!(shown.contains("basic_elements.sell_button"));
        assert!(shown.contains("tried: .sell"));
        assert!(!shown.contains("'skip'"));
    }

    #[test]
    fn keywords() {
        assert_eq!(answer("skip\n", false).0, RepairResponse::Skip);
        assert_eq!(answer("NEXT\n", true).0, RepairResponse::Decline);
        assert_eq!(answer("\n", true).0, RepairResponse::Decline);
        assert_eq!(answer("q\n", true).0, RepairResponse::Abort);
    }

    #[test]
    fn closed_input_declines() {
        assert_eq!(answer("", true).0, RepairResponse::Decline);
    }

    #[test]
    fn optional_prompt_offers_skip() {
        let (_, shown) = answer("next\n", false);
        assert!(shown.contains("(optional)"));
        assert!(shown.contains("'skip'"));
    }
}
