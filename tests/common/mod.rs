#![allow(dead_code)]

pub mod test_server {
    use std::sync::Once;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    /// Parsed raw HTTP/1.1 response.
    #[derive(Debug)]
    pub struct RawResponse {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    impl RawResponse {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Send one request with `Connection: close` and read the full response.
    pub fn send_request(addr: &SocketAddr, request: &str) -> RawResponse {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        stream.write_all(request.as_bytes()).unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    if response_complete(&buf) {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
        parse_response(&String::from_utf8_lossy(&buf))
    }

    fn response_complete(buf: &[u8]) -> bool {
        let text = String::from_utf8_lossy(buf);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .find_map(|l| {
                let (k, v) = l.split_once(':')?;
                k.trim()
                    .eq_ignore_ascii_case("content-length")
                    .then(|| v.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        body.len() >= length
    }

    fn parse_response(raw: &str) -> RawResponse {
        let (head, body) = raw.split_once("\r\n\r\n").unwrap_or((raw, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| {
                let (k, v) = l.split_once(':')?;
                Some((k.trim().to_string(), v.trim().to_string()))
            })
            .collect();
        RawResponse {
            status,
            headers,
            body: body.to_string(),
        }
    }
}

pub mod fixtures {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use forumrouter::{
        handler_fn, AppConfig, Dispatcher, HandlerRegistry, HandlerResponse, MiddlewareRegistry,
        RouteTable,
    };
    use serde_json::json;

    /// Counts invocations per test.
    #[derive(Clone, Default)]
    pub struct CallCounter(Arc<AtomicUsize>);

    impl CallCounter {
        pub fn get(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }

        pub fn bump(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Registry where every handler of `table` answers with its own reference
    /// and bumps `counter`.
    pub fn recording_handlers(table: &RouteTable, counter: &CallCounter) -> HandlerRegistry {
        let mut handlers = HandlerRegistry::new();
        for route in table.iter() {
            let reference = route.handler.to_string();
            let counter = counter.clone();
            let name = reference.clone();
            handlers
                .register(
                    &reference,
                    handler_fn(move |_ctx, params| {
                        counter.bump();
                        Ok(HandlerResponse::json(
                            200,
                            json!({ "handler": name, "params": params.to_map() }),
                        ))
                    }),
                )
                .unwrap();
        }
        handlers
    }

    /// Dispatcher over `table` with recording handlers and the standard
    /// middleware set.
    pub fn dispatcher_for(table: RouteTable, config: &AppConfig) -> (Dispatcher, CallCounter) {
        let counter = CallCounter::default();
        let handlers = recording_handlers(&table, &counter);
        let middleware = MiddlewareRegistry::standard(config).unwrap();
        (
            Dispatcher::build(table, &handlers, &middleware).unwrap(),
            counter,
        )
    }
}
