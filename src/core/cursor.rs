// Cursor-token pagination over list endpoints, with token history for moving backward.
use crate::core::dispatch::{Dispatcher, RequestDescriptor};
use crate::core::error::{ApiResult, Error, ErrorKind};
use serde_json::Value;
use tracing::debug;

pub type Page = Vec<Value>;

/// Field names of a list endpoint's response envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageShape {
    pub items_field: String,
    pub token_field: String,
    pub cursor_param: String,
}

impl PageShape {
    pub fn new(
        items_field: impl Into<String>,
        token_field: impl Into<String>,
        cursor_param: impl Into<String>,
    ) -> Self {
        Self {
            items_field: items_field.into(),
            token_field: token_field.into(),
            cursor_param: cursor_param.into(),
        }
    }

    pub fn with_items_field(mut self, items_field: impl Into<String>) -> Self {
        self.items_field = items_field.into();
        self
    }
}

impl Default for PageShape {
    fn default() -> Self {
        Self::new("data", "nextPageCursor", "cursor")
    }
}

/// Forward/backward pager over one list request.
///
/// `tokens[i]` is the token that fetches page `i`; `tokens[0]` is always `None`.
/// Tokens are only appended, never rewritten, so walking back and forward again
/// reuses the tokens already seen. Pages themselves are not retained: moving
/// backward re-fetches. Methods take `&mut self`, so one caller drives a cursor
/// at a time.
pub struct PageCursor {
    dispatcher: Dispatcher,
    request: RequestDescriptor,
    shape: PageShape,
    tokens: Vec<Option<String>>,
    index: usize,
    current: Option<Page>,
    exhausted: bool,
}

impl PageCursor {
    pub fn new(dispatcher: Dispatcher, request: RequestDescriptor, shape: PageShape) -> Self {
        Self {
            dispatcher,
            request,
            shape,
            tokens: vec![None],
            index: 0,
            current: None,
            exhausted: false,
        }
    }

    pub fn tokens(&self) -> &[Option<String>] {
        &self.tokens
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Last fetched page, if any, without touching the network.
    pub fn current(&self) -> Option<&Page> {
        self.current.as_ref()
    }

    /// Fetches the page after the current one. Returns `None` once the last page
    /// has been reached, without a network call.
    pub fn next_page(&mut self) -> ApiResult<Option<Page>> {
        if self.exhausted {
            return Ok(None);
        }
        let target = if self.current.is_some() {
            self.index + 1
        } else {
            self.index
        };
        let Some(token) = self.tokens.get(target).cloned() else {
            self.exhausted = true;
            return Ok(None);
        };

        let (page, next) = self.fetch(token.as_deref())?;
        self.index = target;
        self.record_next(next);
        self.current = Some(page.clone());
        Ok(Some(page))
    }

    /// Re-fetches the page before the current one. Returns `None` at the first page
    /// and leaves the cursor unchanged.
    pub fn previous_page(&mut self) -> ApiResult<Option<Page>> {
        if self.index == 0 {
            return Ok(None);
        }
        let target = self.index - 1;
        let token = self.tokens[target].clone();

        let (page, next) = self.fetch(token.as_deref())?;
        self.index = target;
        self.record_next(next);
        self.current = Some(page.clone());
        Ok(Some(page))
    }

    /// The page at the current position; fetched only if nothing non-empty is held.
    pub fn current_page(&mut self) -> ApiResult<Page> {
        if let Some(page) = &self.current {
            if !page.is_empty() {
                return Ok(page.clone());
            }
        }
        let token = self.tokens[self.index].clone();

        let (page, next) = self.fetch(token.as_deref())?;
        self.record_next(next);
        self.current = Some(page.clone());
        Ok(page)
    }

    fn record_next(&mut self, next: Option<String>) {
        let known_ahead = self.index + 1 < self.tokens.len();
        match next {
            Some(token) if !known_ahead => {
                self.tokens.push(Some(token));
                self.exhausted = false;
            }
            Some(_) => self.exhausted = false,
            None => self.exhausted = !known_ahead,
        }
    }

    fn fetch(&self, token: Option<&str>) -> ApiResult<(Page, Option<String>)> {
        let mut request = self.request.clone();
        if let Some(token) = token {
            request
                .url
                .query_pairs_mut()
                .append_pair(&self.shape.cursor_param, token);
        }
        debug!(url = %request.url, index = self.index, "fetching page");

        let response = self.dispatcher.send(&request)?;
        if response.status != 200 {
            return Err(Error::new(ErrorKind::UnknownHttp)
                .with_message("unexpected status for page fetch")
                .with_status(response.status));
        }
        let envelope: Value = serde_json::from_slice(&response.body).map_err(|err| {
            Error::new(ErrorKind::Network)
                .with_message("invalid page json")
                .with_source(err)
        })?;
        parse_page(&envelope, &self.shape)
    }
}

fn parse_page(envelope: &Value, shape: &PageShape) -> ApiResult<(Page, Option<String>)> {
    let items = match envelope.get(&shape.items_field) {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            return Err(Error::new(ErrorKind::Network).with_message(format!(
                "page field `{}` is not an array",
                shape.items_field
            )));
        }
    };
    let next = envelope
        .get(&shape.token_field)
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string);
    Ok((items, next))
}
