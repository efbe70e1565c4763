use super::*;
use std::io::Cursor;

#[tokio::test]
async fn round_trips_a_request_frame() {
    let request = WorkerRequest {
        args: vec!["echo".to_string(), "hi".to_string()],
        dir: "/work".to_string(),
        env: HashMap::new(),
        stdin_data: None,
    };
    let mut buf = Vec::new();
    write_frame(&mut buf, &request).await.unwrap();

    let mut cursor = Cursor::new(buf);
    let decoded: WorkerRequest = read_frame(&mut cursor).await.unwrap();
    assert_eq!(decoded.args, request.args);
    assert_eq!(decoded.dir, request.dir);
}

#[tokio::test]
async fn length_prefix_is_big_endian_u32() {
    let response = WorkerResponse {
        stdout: b"hi\n".to_vec(),
        stderr: Vec::new(),
        exit_code: 0,
        error_message: None,
    };
    let mut buf = Vec::new();
    write_frame(&mut buf, &response).await.unwrap();
    let body_len = serde_json::to_vec(&response).unwrap().len() as u32;
    assert_eq!(&buf[0..4], &body_len.to_be_bytes());
}
