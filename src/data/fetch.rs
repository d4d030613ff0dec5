use crate::data::bar::{parse_date, parse_number, Bar};
use crate::error::{AppError, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

const BASE_URL: &str = "https://api.twelvedata.com";

pub const DEFAULT_INTERVAL: &str = "1day";
/// Roughly five years of trading days.
pub const DEFAULT_OUTPUTSIZE: u32 = 1260;
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

pub struct TwelveDataClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TwelveDataClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn time_series(
        &self,
        symbol: &str,
        interval: &str,
        outputsize: u32,
        timezone: &str,
    ) -> Result<Vec<Bar>> {
        let url = format!("{}/time_series", self.base_url);
        let outputsize_str = outputsize.to_string();
        debug!(symbol, interval, outputsize, "requesting time series");

        let res = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", interval),
                ("outputsize", &outputsize_str),
                ("timezone", timezone),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .json::<Value>()
            .await?;

        parse_time_series(&res)
    }

    pub async fn price(&self, symbol: &str) -> Result<f64> {
        let url = format!("{}/price", self.base_url);
        let res = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("apikey", &self.api_key)])
            .send()
            .await?
            .json::<Value>()
            .await?;

        parse_price(&res)
    }
}

fn check_status(json: &Value) -> Result<()> {
    if json.get("status").and_then(|s| s.as_str()) == Some("error") {
        return Err(AppError::Api {
            code: json.get("code").and_then(|c| c.as_i64()).unwrap_or(0),
            message: json
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string(),
        });
    }
    Ok(())
}

fn str_field<'a>(obj: &'a Value, name: &str) -> Result<&'a str> {
    obj.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::Parse(format!("missing field '{}'", name)))
}

/// The API returns newest first; bars come back ascending by date.
pub fn parse_time_series(json: &Value) -> Result<Vec<Bar>> {
    check_status(json)?;

    let values = json
        .get("values")
        .and_then(|v| v.as_array())
        .ok_or_else(|| AppError::Parse("response has no 'values' array".to_string()))?;

    let mut bars = values
        .iter()
        .map(|v| {
            Ok(Bar {
                date: parse_date(str_field(v, "datetime")?)?,
                open: parse_number("open", str_field(v, "open")?)?,
                high: parse_number("high", str_field(v, "high")?)?,
                low: parse_number("low", str_field(v, "low")?)?,
                close: parse_number("close", str_field(v, "close")?)?,
                // indices and some FX symbols come without volume
                volume: match v.get("volume").and_then(|x| x.as_str()) {
                    Some(raw) => parse_number("volume", raw)?,
                    None => 0.0,
                },
            })
        })
        .collect::<Result<Vec<Bar>>>()?;

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

pub fn parse_price(json: &Value) -> Result<f64> {
    check_status(json)?;
    parse_number("price", str_field(json, "price")?)
}

/// A one-route HTTP/1.1 server on localhost that answers each request with
/// the JSON body `respond` returns for its request target.
#[cfg(test)]
pub(crate) mod local_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    pub async fn serve<F>(respond: F) -> String
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let respond = std::sync::Arc::new(respond);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let respond = respond.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let request = String::from_utf8_lossy(&request);
                    let target = request.split_whitespace().nth(1).unwrap_or("/");
                    let body = respond(target);
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }
}
