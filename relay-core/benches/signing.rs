use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use relay_core::protocol::{CompletionRequest, Message};
use relay_core::providers::bedrock::ModelFamily;
use relay_core::signing::{AwsCredentials, SigV4Signer};
use reqwest::{Method, Request, Url};

fn bench_sign(c: &mut Criterion) {
    let signer = SigV4Signer::new(
        AwsCredentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
        "us-east-1",
        "bedrock",
    );
    let url = Url::parse(
        "https://bedrock-runtime.us-east-1.amazonaws.com/model/anthropic.claude-3-haiku-20240307-v1%3A0/invoke",
    )
    .unwrap();
    let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
    let body = vec![b'x'; 4096];

    c.bench_function("sigv4_sign_4k", |b| {
        b.iter(|| {
            let mut request = Request::new(Method::POST, url.clone());
            signer.sign_at(&mut request, black_box(&body), now).unwrap();
            request
        })
    });
}

fn bench_transform(c: &mut Criterion) {
    let request = CompletionRequest::new(
        "meta.llama3-8b-instruct-v1:0",
        (0..32)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("question {}", i))
                } else {
                    Message::assistant(format!("answer {}", i))
                }
            })
            .collect(),
    );

    c.bench_function("bedrock_meta_transform", |b| {
        b.iter(|| serde_json::to_vec(&ModelFamily::Meta.transform(black_box(&request))).unwrap())
    });
}

criterion_group!(benches, bench_sign, bench_transform);
criterion_main!(benches);
