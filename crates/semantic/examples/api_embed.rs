use std::{env, error::Error};

use semantic::{build_embedder, ApiProvider, SemanticConfig};

/// Embeds a few item descriptions through the configured provider and prints
/// the pairwise cosine similarity against the first one.
///
/// ## OpenAI (default)
/// ```bash
/// LOSTFOUND_EMBEDDING_API_KEY=sk-xxx \
/// cargo run -p lostfound-semantic --example api_embed -- "Red Wallet" "red leather wallet" "Blue Pen"
/// ```
///
/// ## Hugging Face Inference API
/// ```bash
/// LOSTFOUND_EMBEDDING_API_URL=https://router.huggingface.co/hf-inference/models/BAAI/bge-small-en-v1.5/pipeline/feature-extraction \
/// LOSTFOUND_EMBEDDING_API_KEY=hf_xxx \
/// LOSTFOUND_EMBEDDING_PROVIDER=huggingface \
/// cargo run -p lostfound-semantic --example api_embed -- "Red Wallet" "Blue Pen"
/// ```
///
/// Set `LOSTFOUND_EMBEDDING_PROVIDER=stub` to run offline.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut texts: Vec<String> = env::args().skip(1).collect();
    if texts.is_empty() {
        texts = vec![
            "Red Wallet. Color: red".into(),
            "Lost my red leather wallet".into(),
            "Blue Pen. Location: Dirac Library".into(),
        ];
    }

    let mut cfg = match env::var("LOSTFOUND_EMBEDDING_PROVIDER").as_deref() {
        Ok("stub") => SemanticConfig::stub(),
        Ok("huggingface") => SemanticConfig {
            provider: ApiProvider::HuggingFace,
            ..SemanticConfig::default()
        },
        Ok("custom") => SemanticConfig {
            provider: ApiProvider::Custom,
            ..SemanticConfig::default()
        },
        _ => SemanticConfig::default(),
    };
    cfg.apply_env_overrides();

    let embedder = build_embedder(&cfg)?;
    let vectors = embedder.embed_texts(&texts).await?;

    println!("model: {} ({} dims)", embedder.model_name(), vectors[0].len());
    let anchor = &vectors[0];
    for (text, vector) in texts.iter().zip(&vectors) {
        let dot: f32 = anchor.iter().zip(vector).map(|(a, b)| a * b).sum();
        let norm = |v: &[f32]| v.iter().map(|x| x * x).sum::<f32>().sqrt();
        let cos = dot / (norm(anchor) * norm(vector)).max(f32::EPSILON);
        println!("{cos:>7.4}  {text}");
    }

    Ok(())
}
