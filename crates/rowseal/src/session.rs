//! Line-delimited JSON request loop.
//!
//! For each input line the session:
//! 1. Parses a [`Request`]; unparseable lines, including lines that are not
//!    UTF-8 or exceed the request size cap, get a `bad_request` error.
//! 2. Runs the matching handler against the shared [`RowCipher`].
//! 3. Writes exactly one JSON [`Response`] line and flushes.
//!
//! Responses are written in request order. Blank lines are skipped.

use anyhow::{Context, Result};
use common::protocol::{Request, Response};
use row_crypto::RowCipher;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, info, warn};

use crate::handlers;

/// Serve requests from `reader` until EOF, writing responses to `writer`.
///
/// A line longer than `max_request_bytes` (newline excluded) is skipped
/// without being buffered and answered with `bad_request`.
///
/// # Errors
///
/// Returns an error if reading input or writing a response fails.
pub async fn run<R, W>(
    reader: R,
    mut writer: W,
    cipher: &RowCipher,
    max_request_bytes: usize,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut served = 0u64;

    loop {
        buf.clear();
        let n = (&mut reader)
            .take(max_request_bytes as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await
            .context("failed to read request")?;
        if n == 0 {
            break;
        }

        let response = if buf.last() != Some(&b'\n') && buf.len() > max_request_bytes {
            discard_line(&mut reader).await.context("failed to read request")?;
            warn!(limit = max_request_bytes, "oversized request skipped");
            Response::error("bad_request", format!("request exceeds {max_request_bytes} bytes"))
        } else if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        } else {
            match serde_json::from_slice::<Request>(&buf) {
                Ok(req) => handlers::handle(cipher, req),
                Err(e) => {
                    // The error's Display can quote input values; report position only.
                    let (category, column) = (e.classify(), e.column());
                    warn!(?category, column, "unparseable request");
                    Response::error(
                        "bad_request",
                        format!("invalid request ({category:?} error at column {column})"),
                    )
                }
            }
        };

        let mut out = serde_json::to_vec(&response).context("failed to serialise response")?;
        out.push(b'\n');
        writer.write_all(&out).await.context("failed to write response")?;
        writer.flush().await.context("failed to flush response")?;
        served += 1;
        debug!(served, "response written");
    }

    info!(served, "input closed; session finished");
    Ok(())
}

/// Consume input up to and including the next newline, or to EOF.
async fn discard_line<B: AsyncBufRead + Unpin>(reader: &mut B) -> std::io::Result<()> {
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(i) => {
                reader.consume(i + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::protocol::OkBody;
    use row_crypto::KeyDerivationService;
    use serde_json::{json, Value};

    fn cipher() -> RowCipher {
        RowCipher::new(KeyDerivationService::from_secret(&[0x42u8; 32]).unwrap())
    }

    const LIMIT: usize = 16 * 1024;

    async fn exchange(input: String) -> Vec<Value> {
        exchange_bytes(input.as_bytes(), LIMIT).await
    }

    async fn exchange_bytes(input: &[u8], limit: usize) -> Vec<Value> {
        let mut out = Vec::new();
        run(input, &mut out, &cipher(), limit).await.unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn one_response_per_request() {
        let input = "{\"op\":\"health\"}\n\n{\"op\":\"health\"}\n".to_owned();
        let responses = exchange(input).await;
        assert_eq!(responses.len(), 2);
        assert!(responses.iter().all(|r| r["status"] == "ok"));
    }

    #[tokio::test]
    async fn bad_request_does_not_end_session() {
        let input = "not json\n{\"op\":\"health\"}\n".to_owned();
        let responses = exchange(input).await;
        assert_eq!(responses[0]["status"], "error");
        assert_eq!(responses[0]["code"], "bad_request");
        assert_eq!(responses[1]["status"], "ok");
    }

    #[tokio::test]
    async fn encrypt_then_decrypt_over_the_wire() {
        let row_id = "11111111-1111-1111-1111-111111111111";
        let encrypt = json!({
            "op": "encrypt",
            "row_id": row_id,
            "fields": [
                {"name": "titre", "value": "Alpha"},
                {"name": "description", "value": ""}
            ]
        });
        let sealed = exchange(format!("{encrypt}\n")).await;
        let payload = sealed[0]["payload"].clone();
        assert_eq!(payload["iv"].as_str().unwrap().len(), 24);
        assert_eq!(payload["tag"].as_str().unwrap().len(), 32);

        let decrypt = json!({
            "op": "decrypt",
            "row_id": row_id,
            "payload": payload,
            "expect": ["titre", "description"]
        });
        let opened = exchange(format!("{decrypt}\n")).await;
        let resp: Response = serde_json::from_value(opened[0].clone()).unwrap();
        let fields = match resp {
            Response::Ok(OkBody {
                fields: Some(fields),
                ..
            }) => fields,
            other => panic!("unexpected response: {other:?}"),
        };
        assert_eq!(fields[0].name, "titre");
        assert_eq!(fields[0].value, "Alpha");
        assert_eq!(fields[1].name, "description");
        assert_eq!(fields[1].value, "");
    }

    #[tokio::test]
    async fn wrong_row_is_rejected() {
        let encrypt = json!({
            "op": "encrypt",
            "row_id": "11111111-1111-1111-1111-111111111111",
            "fields": [{"name": "nom", "value": "Dupont"}]
        });
        let sealed = exchange(format!("{encrypt}\n")).await;
        let decrypt = json!({
            "op": "decrypt",
            "row_id": "22222222-2222-2222-2222-222222222222",
            "payload": sealed[0]["payload"]
        });
        let opened = exchange(format!("{decrypt}\n")).await;
        assert_eq!(opened[0]["code"], "authentication_error");
        assert!(!opened[0].to_string().contains("Dupont"));
    }

    #[tokio::test]
    async fn non_utf8_line_does_not_end_session() {
        let responses = exchange_bytes(b"\xff\xfe\n{\"op\":\"health\"}\n", LIMIT).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["code"], "bad_request");
        assert_eq!(responses[1]["status"], "ok");
    }

    #[tokio::test]
    async fn oversized_line_is_skipped() {
        let mut input = vec![b'x'; 200];
        input.extend_from_slice(b"\n{\"op\":\"health\"}\n");
        let responses = exchange_bytes(&input, 64).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["code"], "bad_request");
        assert!(responses[0]["message"].as_str().unwrap().contains("64 bytes"));
        assert_eq!(responses[1]["status"], "ok");
    }

    #[tokio::test]
    async fn line_at_the_limit_is_accepted() {
        let health = b"{\"op\":\"health\"}";
        let mut input = health.to_vec();
        input.push(b'\n');
        let responses = exchange_bytes(&input, health.len()).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["status"], "ok");
    }

    #[tokio::test]
    async fn unterminated_oversized_tail_gets_one_error() {
        let mut input = b"{\"op\":\"health\"}\n".to_vec();
        input.resize(input.len() + 500, b'y');
        let responses = exchange_bytes(&input, 64).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["status"], "ok");
        assert_eq!(responses[1]["code"], "bad_request");
    }
}
