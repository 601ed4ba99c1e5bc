//! Tests for the HTTP parser and body decoder.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use serde::Deserialize;

    use crate::cache::CacheManager;
    use crate::parser::multipart::MultipartParser;
    use crate::parser::{
        decode_body, decode_parameters, decode_percent, parse_chunk_size, parse_request, Body, BodyError,
        BodyLimits, BodyPart, BodyValue, ContentType, Error, HttpRequest, HttpVersion, Method, RAW_FIELD,
    };

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect()
    }

    async fn decode(pairs: &[(&str, &str)], body: &[u8], cache: &mut CacheManager) -> Result<Body, BodyError> {
        let mut reader = body;
        decode_body(&headers(pairs), &mut reader, cache, &BodyLimits::default()).await
    }

    #[test]
    fn test_parse_simple_get_request() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.method, Method::GET);
        assert_eq!(result.path, "/index.html");
        assert_eq!(result.version, HttpVersion::Http11);
        assert_eq!(result.headers.get("host").unwrap(), "example.com");
        assert!(result.body.is_empty());
    }

    #[test]
    fn test_parse_request_with_multiple_headers() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nUser-Agent: test\r\nAccept:   */*  \r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.headers.len(), 3);
        assert_eq!(result.headers.get("user-agent").unwrap(), "test");
        assert_eq!(result.headers.get("accept").unwrap(), "*/*");
    }

    #[test]
    fn test_case_insensitive_headers() {
        let request = b"GET /index.html HTTP/1.1\r\nHoSt: example.com\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert!(result.has_header("host"));
        assert!(result.has_header("HOST"));
        assert_eq!(result.get_header("Host").unwrap(), "example.com");
    }

    #[test]
    fn test_duplicate_header_keeps_last() {
        let request = b"GET / HTTP/1.1\r\nX-Tag: first\r\nx-tag: second\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.get_header("X-Tag").unwrap(), "second");
    }

    #[test]
    fn test_header_value_keeps_colons() {
        let request = b"GET / HTTP/1.1\r\nHost: example.com:8080\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.get_header("host").unwrap(), "example.com:8080");
    }

    #[test]
    fn test_invalid_method() {
        let request = b"INVALID /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let result = parse_request(request);
        assert!(matches!(result, Err(Error::InvalidMethod(ref m)) if m == "INVALID"));
    }

    #[test]
    fn test_missing_method() {
        let request = b"/index.html HTTP/1.1\r\n\r\n";
        let result = parse_request(request);
        assert!(matches!(result, Err(Error::InvalidMethod(ref m)) if m == "/index.html"));
    }

    #[test]
    fn test_missing_uri() {
        let request = b"GET\r\n\r\n";
        assert!(matches!(parse_request(request), Err(Error::InvalidPath)));
    }

    #[test]
    fn test_missing_version_defaults_to_http11() {
        let request = b"GET /legacy\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.version, HttpVersion::Http11);
        assert_eq!(result.path, "/legacy");
    }

    #[test]
    fn test_invalid_http_version() {
        let request = b"GET /index.html HTTP/9.9\r\nHost: example.com\r\n\r\n";
        let result = parse_request(request);
        assert!(matches!(result, Err(Error::InvalidVersion(ref v)) if v == "HTTP/9.9"));
    }

    #[test]
    fn test_too_many_request_line_parts() {
        let request = b"GET /a /b HTTP/1.1\r\n\r\n";
        assert!(matches!(parse_request(request), Err(Error::MalformedRequestLine(_))));
    }

    #[test]
    fn test_invalid_header_format() {
        let request = b"GET /index.html HTTP/1.1\r\nInvalidHeader\r\n\r\n";
        let result = parse_request(request);
        assert!(matches!(result, Err(Error::InvalidHeaderFormat(ref line)) if line == "InvalidHeader"));
    }

    #[test]
    fn test_empty_header_name() {
        let request = b"GET / HTTP/1.1\r\n: value\r\n\r\n";
        assert!(matches!(parse_request(request), Err(Error::InvalidHeaderFormat(_))));
    }

    #[test]
    fn test_empty_request() {
        assert!(matches!(parse_request(b""), Err(Error::EmptyRequest)));
        assert!(matches!(parse_request(b"\r\n\r\n"), Err(Error::EmptyRequest)));
    }

    #[test]
    fn test_invalid_utf8() {
        let request = b"GET /\xff HTTP/1.1\r\n\r\n";
        assert!(matches!(parse_request(request), Err(Error::MalformedRequestLine(_))));
    }

    #[test]
    fn test_all_methods_parse() {
        for token in [
            "GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "TRACE", "CONNECT", "PATCH", "PROPFIND",
            "PROPPATCH", "MKCOL", "MOVE", "COPY", "LOCK", "UNLOCK",
        ] {
            let request = format!("{token} / HTTP/1.1\r\n\r\n");
            let result = parse_request(request.as_bytes()).unwrap();
            assert_eq!(result.method.to_string(), token);
        }
        assert!(parse_request(b"get / HTTP/1.1\r\n\r\n").is_err());
    }

    #[test]
    fn test_query_string_and_path_decoding() {
        let request = b"GET /files/my%20doc.txt?foo=bar&foo=baz&zot&zim= HTTP/1.1\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.path, "/files/my doc.txt");
        assert_eq!(result.raw_uri, "/files/my%20doc.txt?foo=bar&foo=baz&zot&zim=");
        assert_eq!(result.query_string.as_deref(), Some("foo=bar&foo=baz&zot&zim="));
        assert_eq!(result.get_query_param("foo"), Some("bar"));
        assert_eq!(result.get_query_params("foo").unwrap(), ["bar", "baz"]);
        assert!(result.has_query_param("zot"));
        assert!(result.get_query_params("zot").unwrap().is_empty());
        assert_eq!(result.get_query_params("zim").unwrap(), [""]);
        assert!(!result.has_query_param("missing"));
    }

    #[test]
    fn test_decode_parameters() {
        let params = decode_parameters("foo=bar&foo=baz&zot&zim=");
        assert_eq!(params.len(), 3);
        assert_eq!(params["foo"], vec!["bar", "baz"]);
        assert!(params["zot"].is_empty());
        assert_eq!(params["zim"], vec![""]);
    }

    #[test]
    fn test_decode_percent() {
        assert_eq!(decode_percent("caf%C3%A9+au+lait"), "café au lait");
        assert_eq!(decode_percent("%E2%9C%93"), "✓");
        assert_eq!(decode_percent("a%2Bb%3Dc"), "a+b=c");
        assert_eq!(decode_percent("plain"), "plain");
    }

    #[test]
    fn test_cookies_parsed_from_header() {
        let request = b"GET / HTTP/1.1\r\nCookie: session=abc123; theme=dark\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.cookies.len(), 2);
        assert_eq!(result.cookies.get("session"), Some("abc123"));
        assert_eq!(result.cookies.get("theme"), Some("dark"));
    }

    #[test]
    fn test_keep_alive_rules() {
        let http11 = parse_request(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        assert!(http11.keep_alive());
        let closing = parse_request(b"GET / HTTP/1.1\r\nConnection: Close\r\n\r\n").unwrap();
        assert!(!closing.keep_alive());
        let http10 = parse_request(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        assert!(!http10.keep_alive());
        let http10_keep = parse_request(b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n").unwrap();
        assert!(http10_keep.keep_alive());
    }

    #[test]
    fn test_accepts_gzip() {
        let yes = parse_request(b"GET / HTTP/1.1\r\nAccept-Encoding: deflate, GZIP;q=0.8\r\n\r\n").unwrap();
        assert!(yes.accepts_gzip());
        let no = parse_request(b"GET / HTTP/1.1\r\nAccept-Encoding: br, deflate\r\n\r\n").unwrap();
        assert!(!no.accepts_gzip());
        let missing = parse_request(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        assert!(!missing.accepts_gzip());
    }

    #[test]
    fn test_content_type_parsing() {
        let ct = ContentType::parse("multipart/form-data; boundary=----abc123");
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary.as_deref(), Some("----abc123"));

        let ct = ContentType::parse("Multipart/Form-Data, boundary=\"xyz\"");
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary.as_deref(), Some("xyz"));

        let ct = ContentType::parse("application/x-www-form-urlencoded; charset=UTF-8");
        assert!(ct.is_url_encoded());
        assert_eq!(ct.charset.as_deref(), Some("UTF-8"));
        assert_eq!(ct.boundary, None);

        assert!(ContentType::parse("application/vnd.api+json").is_json());
    }

    #[test]
    fn test_parse_chunk_size() {
        assert_eq!(parse_chunk_size("1a").unwrap(), 26);
        assert_eq!(parse_chunk_size("FF; name=value").unwrap(), 255);
        assert_eq!(parse_chunk_size("0").unwrap(), 0);
        assert!(matches!(parse_chunk_size(""), Err(BodyError::MalformedChunk(_))));
        assert!(matches!(parse_chunk_size("zz"), Err(BodyError::MalformedChunk(_))));
    }

    #[tokio::test]
    async fn test_decode_url_encoded_body() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());
        let payload = b"foo=bar&foo=baz&zot&zim=&name=J%C3%BCrgen+M";
        let body = decode(
            &[
                ("Content-Type", "application/x-www-form-urlencoded"),
                ("Content-Length", &payload.len().to_string()),
            ],
            payload,
            &mut cache,
        )
        .await
        .unwrap();

        assert_eq!(body.texts("foo"), vec!["bar", "baz"]);
        assert!(body.contains("zot"));
        assert!(body.get_all("zot").is_empty());
        assert_eq!(body.texts("zim"), vec![""]);
        assert_eq!(body.text("name"), Some("Jürgen M"));
        assert!(cache.is_empty());
    }

    fn multipart_payload(boundary: &str) -> Vec<u8> {
        format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"caption\"\r\n\
             \r\n\
             A day at the beach\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"caption\"; filename=\"x.txt\"\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             line one\r\nline two\r\n\
             --{boundary}--\r\n\
             epilogue is ignored"
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn test_decode_multipart_field_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());
        let payload = multipart_payload("XyZ");
        let body = decode(
            &[
                ("Content-Type", "multipart/form-data; boundary=XyZ"),
                ("Content-Length", &payload.len().to_string()),
            ],
            &payload,
            &mut cache,
        )
        .await
        .unwrap();

        let parts = body.get_all("caption");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].as_text(), Some("A day at the beach"));
        assert_eq!(parts[0].filename, None);

        let file = parts[1].as_file().unwrap();
        assert_eq!(parts[1].filename.as_deref(), Some("x.txt"));
        assert_eq!(parts[1].content_type.as_deref(), Some("text/plain"));
        assert_eq!(file.as_bytes().await.unwrap(), b"line one\r\nline two");
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(!file.path().exists());
    }

    #[tokio::test]
    async fn test_decode_multipart_boundary_after_comma() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());
        let payload = b"--b1\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--b1--\r\n";
        let body = decode(
            &[
                ("Content-Type", "multipart/form-data, boundary=b1"),
                ("Content-Length", &payload.len().to_string()),
            ],
            payload,
            &mut cache,
        )
        .await
        .unwrap();
        assert_eq!(body.text("a"), Some("1"));
    }

    #[tokio::test]
    async fn test_decode_multipart_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());

        let result = decode(
            &[("Content-Type", "multipart/form-data"), ("Content-Length", "4")],
            b"data",
            &mut cache,
        )
        .await;
        assert!(matches!(result, Err(BodyError::MissingBoundary)));

        let unterminated = b"--b1\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nvalue";
        let result = decode(
            &[
                ("Content-Type", "multipart/form-data; boundary=b1"),
                ("Content-Length", &unterminated.len().to_string()),
            ],
            unterminated,
            &mut cache,
        )
        .await;
        assert!(matches!(result, Err(BodyError::MalformedMultipart(_))));

        let nameless = b"--b1\r\nContent-Disposition: form-data\r\n\r\nvalue\r\n--b1--";
        let result = decode(
            &[
                ("Content-Type", "multipart/form-data; boundary=b1"),
                ("Content-Length", &nameless.len().to_string()),
            ],
            nameless,
            &mut cache,
        )
        .await;
        assert!(matches!(result, Err(BodyError::MalformedMultipart(_))));
    }

    #[tokio::test]
    async fn test_multipart_dash_line_after_bare_lf_is_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());
        let payload = b"--XyZ\r\n\
            Content-Disposition: form-data; name=\"notes\"\r\n\r\n\
            first\n--XyZ\nstill notes\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"tail\"\r\n\r\n\
            end\r\n\
            --XyZ--\r\n";
        let body = decode(
            &[
                ("Content-Type", "multipart/form-data; boundary=XyZ"),
                ("Content-Length", &payload.len().to_string()),
            ],
            payload,
            &mut cache,
        )
        .await
        .unwrap();

        assert_eq!(body.text("notes"), Some("first\n--XyZ\nstill notes"));
        assert_eq!(body.text("tail"), Some("end"));
    }

    #[tokio::test]
    async fn test_multipart_boundaries_split_across_reads() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());
        let payload = multipart_payload("XyZ");

        let mut parser = MultipartParser::new("XyZ", u64::MAX);
        for piece in payload.chunks(3) {
            parser.push(piece, &mut cache).await.unwrap();
        }
        let body = parser.finish().unwrap();

        let parts = body.get_all("caption");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].as_text(), Some("A day at the beach"));
        let file = parts[1].as_file().unwrap();
        assert_eq!(file.as_bytes().await.unwrap(), b"line one\r\nline two");
    }

    #[tokio::test]
    async fn test_multipart_file_part_streams_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());
        let content: Vec<u8> = (0..100 * 1024u32).map(|i| (i % 251) as u8).collect();

        let mut payload = b"--up\r\nContent-Disposition: form-data; name=\"blob\"; filename=\"blob.bin\"\r\n\
            Content-Type: application/octet-stream\r\n\r\n"
            .to_vec();
        payload.extend_from_slice(&content);
        payload.extend_from_slice(b"\r\n--up--\r\n");

        let mut parser = MultipartParser::new("up", u64::MAX);
        let mut peak = 0;
        for piece in payload.chunks(1024) {
            parser.push(piece, &mut cache).await.unwrap();
            peak = peak.max(parser.buffered());
        }
        // Only a partial delimiter is held back between reads
        assert!(peak < 64, "buffered {peak} bytes");

        let body = parser.finish().unwrap();
        let file = body.file("blob").unwrap();
        assert_eq!(file.as_bytes().await.unwrap(), content);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_multipart_over_limit_while_streaming() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());
        let limits = BodyLimits {
            memory_store_limit: 1024,
            max_body_size: 64,
        };
        let payload = format!(
            "--b1\r\nContent-Disposition: form-data; name=\"f\"; filename=\"f\"\r\n\r\n{}\r\n--b1--\r\n",
            "x".repeat(200)
        );
        let wire = format!("{:x}\r\n{payload}\r\n0\r\n\r\n", payload.len());
        let mut reader = wire.as_bytes();
        let result = decode_body(
            &headers(&[
                ("Transfer-Encoding", "chunked"),
                ("Content-Type", "multipart/form-data; boundary=b1"),
            ]),
            &mut reader,
            &mut cache,
            &limits,
        )
        .await;
        assert!(matches!(result, Err(BodyError::TooLarge(64))));
    }

    #[tokio::test]
    async fn test_decode_raw_small_and_large() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());

        let body = decode(
            &[("Content-Type", "text/plain"), ("Content-Length", "11")],
            b"hello world",
            &mut cache,
        )
        .await
        .unwrap();
        let raw = body.raw().unwrap();
        assert_eq!(raw.as_text(), Some("hello world"));
        assert_eq!(raw.content_type.as_deref(), Some("text/plain"));
        assert!(cache.is_empty());

        let large: Vec<u8> = (0..5000u32).map(|i| (i % 256) as u8).collect();
        let body = decode(
            &[("Content-Type", "application/octet-stream"), ("Content-Length", "5000")],
            &large,
            &mut cache,
        )
        .await
        .unwrap();
        let file = body.file(RAW_FIELD).unwrap();
        assert_eq!(file.as_bytes().await.unwrap(), large);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_small_binary_raw_body_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());
        let payload = [0xff, 0x00, 0x01, 0x02];
        let body = decode(
            &[("Content-Type", "application/octet-stream"), ("Content-Length", "4")],
            &payload,
            &mut cache,
        )
        .await
        .unwrap();

        let raw = body.raw().unwrap();
        assert_eq!(raw.as_text(), None);
        assert_eq!(raw.content_type.as_deref(), Some("application/octet-stream"));
        assert_eq!(raw.as_file().unwrap().as_bytes().await.unwrap(), payload);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_content_type_falls_back_to_raw() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());
        let body = decode(&[("Content-Length", "3")], b"abc", &mut cache).await.unwrap();
        assert_eq!(body.text(RAW_FIELD), Some("abc"));

        let body = decode(
            &[("Content-Type", "application/x-custom"), ("Content-Length", "3")],
            b"xyz",
            &mut cache,
        )
        .await
        .unwrap();
        assert_eq!(body.text(RAW_FIELD), Some("xyz"));
    }

    #[tokio::test]
    async fn test_decode_chunked_body() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());
        let wire = b"4\r\nWiki\r\n5;ext=1\r\npedia\r\n0\r\nX-Trailer: ignored\r\n\r\nGET /next";
        let mut reader: &[u8] = wire;
        let body = decode_body(
            &headers(&[("Transfer-Encoding", "chunked"), ("Content-Type", "text/plain")]),
            &mut reader,
            &mut cache,
            &BodyLimits::default(),
        )
        .await
        .unwrap();
        assert_eq!(body.text(RAW_FIELD), Some("Wikipedia"));
        assert_eq!(reader, b"GET /next");
    }

    #[tokio::test]
    async fn test_decode_chunked_url_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());
        let body = decode(
            &[
                ("Transfer-Encoding", "chunked"),
                ("Content-Type", "application/x-www-form-urlencoded"),
            ],
            b"3\r\na=1\r\n4\r\n&b=2\r\n0\r\n\r\n",
            &mut cache,
        )
        .await
        .unwrap();
        assert_eq!(body.text("a"), Some("1"));
        assert_eq!(body.text("b"), Some("2"));
    }

    #[tokio::test]
    async fn test_decode_malformed_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());
        let te = [("Transfer-Encoding", "chunked")];

        let result = decode(&te, b"xyz\r\nabc\r\n0\r\n\r\n", &mut cache).await;
        assert!(matches!(result, Err(BodyError::MalformedChunk(_))));

        let result = decode(&te, b"a\r\nshort", &mut cache).await;
        assert!(matches!(result, Err(BodyError::MalformedChunk(_))));

        let result = decode(&te, b"3\r\nabcdef\r\n0\r\n\r\n", &mut cache).await;
        assert!(matches!(result, Err(BodyError::MalformedChunk(_))));

        let result = decode(&te, b"3\r\nabc\r\n", &mut cache).await;
        assert!(matches!(result, Err(BodyError::MalformedChunk(_))));
    }

    #[tokio::test]
    async fn test_content_length_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());
        let result = decode(&[("Content-Length", "10")], b"short", &mut cache).await;
        assert!(matches!(
            result,
            Err(BodyError::Truncated {
                expected: 10,
                received: 5
            })
        ));

        let result = decode(&[("Content-Length", "ten")], b"short", &mut cache).await;
        assert!(matches!(result, Err(BodyError::InvalidContentLength(_))));
    }

    #[tokio::test]
    async fn test_zero_length_and_missing_body() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());
        let body = decode(
            &[("Content-Type", "application/x-www-form-urlencoded"), ("Content-Length", "0")],
            b"",
            &mut cache,
        )
        .await
        .unwrap();
        assert!(body.is_empty());

        let body = decode(&[], b"", &mut cache).await.unwrap();
        assert!(body.is_empty());

        let body = decode(&[("Transfer-Encoding", "chunked")], b"0\r\n\r\n", &mut cache)
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_transfer_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());
        let result = decode(&[("Transfer-Encoding", "gzip")], b"", &mut cache).await;
        assert!(matches!(result, Err(BodyError::UnsupportedTransferEncoding(ref te)) if te == "gzip"));

        let body = decode(&[("Transfer-Encoding", "identity"), ("Content-Length", "2")], b"ok", &mut cache)
            .await
            .unwrap();
        assert_eq!(body.text(RAW_FIELD), Some("ok"));
    }

    #[tokio::test]
    async fn test_body_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CacheManager::new(dir.path());
        let limits = BodyLimits {
            memory_store_limit: 4,
            max_body_size: 8,
        };

        let mut reader: &[u8] = b"0123456789";
        let result = decode_body(&headers(&[("Content-Length", "10")]), &mut reader, &mut cache, &limits).await;
        assert!(matches!(result, Err(BodyError::TooLarge(8))));

        let mut reader: &[u8] = b"5\r\n01234\r\n5\r\n56789\r\n0\r\n\r\n";
        let result = decode_body(
            &headers(&[("Transfer-Encoding", "chunked")]),
            &mut reader,
            &mut cache,
            &limits,
        )
        .await;
        assert!(matches!(result, Err(BodyError::TooLarge(8))));
    }

    #[test]
    fn test_body_error_status() {
        use crate::server::StatusCode;

        assert_eq!(BodyError::MissingBoundary.status(), Some(StatusCode::BadRequest));
        assert_eq!(
            BodyError::UnsupportedTransferEncoding("br".to_string()).status(),
            Some(StatusCode::BadRequest)
        );
        assert_eq!(BodyError::TooLarge(1).status(), Some(StatusCode::PayloadTooLarge));
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(BodyError::Io(io).status(), None);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
        email: String,
    }

    #[tokio::test]
    async fn test_json_body() {
        let mut body = Body::new();
        body.insert(RAW_FIELD, BodyPart::text(r#"{"name":"Ada","email":"ada@example.com"}"#));
        let mut request_headers = HashMap::new();
        request_headers.insert("Content-Type".to_string(), "application/json".to_string());
        let request = HttpRequest::with_body(
            Method::POST,
            "/users".to_string(),
            HttpVersion::Http11,
            request_headers,
            body,
        );

        let user: User = request.json().await.unwrap();
        assert_eq!(
            user,
            User {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_json_requires_content_type() {
        let request = parse_request(b"POST /users HTTP/1.1\r\nContent-Type: text/plain\r\n\r\n").unwrap();
        let result: Result<User, Error> = request.json().await;
        assert!(matches!(result, Err(Error::MissingHeader(_))));
    }

    #[test]
    fn test_body_value_accessors() {
        let mut body = Body::new();
        body.insert("a", BodyPart::text("1"));
        body.insert_name("flag");
        assert_eq!(body.len(), 2);
        assert!(matches!(body.get("a").map(|p| &p.value), Some(BodyValue::Text(v)) if v == "1"));
        assert!(body.file("a").is_none());
        assert!(body.get("flag").is_none());
        let mut names: Vec<&str> = body.names().collect();
        names.sort();
        assert_eq!(names, vec!["a", "flag"]);
    }
}
