//! Predefined catalog of downloadable GGUF models.

use serde::Serialize;

/// A model the operator can pick instead of typing a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelCatalogEntry {
    /// Display name, also the lookup key.
    pub name: &'static str,
    pub url: &'static str,
    /// File stem the backend saves the download under (`{filename}.gguf`).
    pub filename: &'static str,
}

/// Entries grouped by size class for display.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CatalogGroup {
    pub label: &'static str,
    pub entries: &'static [ModelCatalogEntry],
}

pub const PREDEFINED_CATALOG: &[CatalogGroup] = &[
    CatalogGroup {
        label: "Medium models",
        entries: &[
            ModelCatalogEntry {
                name: "Llama 3.1 8B",
                url: "https://huggingface.co/bartowski/Meta-Llama-3.1-8B-Instruct-GGUF/resolve/main/Meta-Llama-3.1-8B-Instruct-Q4_K_M.gguf?download=true",
                filename: "llama3.1-8b",
            },
            ModelCatalogEntry {
                name: "Qwen 2.5 7B",
                url: "https://huggingface.co/lmstudio-community/Qwen2.5-7B-Instruct-GGUF/resolve/main/Qwen2.5-7B-Instruct-Q4_K_M.gguf?download=true",
                filename: "qwen2.5-7b",
            },
            ModelCatalogEntry {
                name: "DeepSeek R1 Distill Llama 8B",
                url: "https://huggingface.co/lmstudio-community/DeepSeek-R1-Distill-Llama-8B-GGUF/resolve/main/DeepSeek-R1-Distill-Llama-8B-Q4_K_M.gguf?download=true",
                filename: "deepseek-r1-distill-llama-8b",
            },
            ModelCatalogEntry {
                name: "Gemma 2 9B it",
                url: "https://huggingface.co/bartowski/gemma-2-9b-it-GGUF/resolve/main/gemma-2-9b-it-Q4_K_M.gguf?download=true",
                filename: "gemma2-9b-it",
            },
        ],
    },
    CatalogGroup {
        label: "Small models",
        entries: &[
            ModelCatalogEntry {
                name: "Llama 3.2 3B",
                url: "https://huggingface.co/hugging-quants/Llama-3.2-3B-Instruct-Q4_K_M-GGUF/resolve/main/llama-3.2-3b-instruct-q4_k_m.gguf",
                filename: "llama3.2-3b",
            },
            ModelCatalogEntry {
                name: "Qwen 2.5 3B",
                url: "https://huggingface.co/Qwen/Qwen2.5-3B-Instruct-GGUF/resolve/main/qwen2.5-3b-instruct-q4_k_m.gguf?download=true",
                filename: "qwen2.5-3b",
            },
        ],
    },
    CatalogGroup {
        label: "Tiny models",
        entries: &[
            ModelCatalogEntry {
                name: "Llama 3.2 1B",
                url: "https://huggingface.co/hugging-quants/Llama-3.2-1B-Instruct-Q4_K_M-GGUF/resolve/main/llama-3.2-1b-instruct-q4_k_m.gguf",
                filename: "llama3.2-1b",
            },
            ModelCatalogEntry {
                name: "Qwen 2 0.5B",
                url: "https://huggingface.co/Qwen/Qwen2-0.5B-Instruct-GGUF/resolve/main/qwen2-0_5b-instruct-q4_k_m.gguf?download=true",
                filename: "qwen2-0.5b",
            },
        ],
    },
];

/// Iterate every predefined entry across groups.
pub fn all_entries() -> impl Iterator<Item = &'static ModelCatalogEntry> {
    PREDEFINED_CATALOG.iter().flat_map(|g| g.entries.iter())
}

/// Look up a predefined entry by display name.
pub fn find_entry(name: &str) -> Option<&'static ModelCatalogEntry> {
    all_entries().find(|e| e.name == name)
}
