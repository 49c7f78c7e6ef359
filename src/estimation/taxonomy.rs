//! Keyword taxonomy driving the rule-based estimator
//!
//! Keywords are stored lowercased and matched as substrings of the lowercased
//! description, so `api` also matches inside `rapidamente`.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Taxonomy errors
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("Keywords cannot be empty")]
    EmptyKeyword,

    #[error("Unknown keyword category: {0}")]
    UnknownCategory(String),

    #[error("Failed to read or write keyword file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid keyword file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Ordered, duplicate-free set of normalised keywords.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct KeywordSet(IndexSet<String>);

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Result<Self, TaxonomyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = IndexSet::new();
        for keyword in keywords {
            set.insert(normalize_keyword(keyword.as_ref())?);
        }
        Ok(Self(set))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.0.contains(keyword)
    }

    /// Keywords contained anywhere in `lowered`, in taxonomy order.
    pub fn matches_in<'a>(&'a self, lowered: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.iter().filter(move |keyword| lowered.contains(keyword))
    }

    /// Total number of (non-overlapping) occurrences of every keyword.
    pub fn occurrences_in(&self, lowered: &str) -> usize {
        self.iter().map(|keyword| lowered.matches(keyword).count()).sum()
    }

    fn insert(&mut self, keyword: &str) -> Result<bool, TaxonomyError> {
        Ok(self.0.insert(normalize_keyword(keyword)?))
    }

    fn remove(&mut self, keyword: &str) -> bool {
        self.0.shift_remove(keyword.trim().to_lowercase().as_str())
    }
}

impl TryFrom<Vec<String>> for KeywordSet {
    type Error = TaxonomyError;

    fn try_from(keywords: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(keywords)
    }
}

impl From<KeywordSet> for Vec<String> {
    fn from(set: KeywordSet) -> Self {
        set.0.into_iter().collect()
    }
}

fn normalize_keyword(keyword: &str) -> Result<String, TaxonomyError> {
    let normalized = keyword.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(TaxonomyError::EmptyKeyword);
    }
    Ok(normalized)
}

/// Complexity tiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityKeywords {
    pub high: KeywordSet,
    pub medium: KeywordSet,
    pub low: KeywordSet,
}

/// Scope tiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeKeywords {
    pub large: KeywordSet,
    pub medium: KeywordSet,
    pub small: KeywordSet,
}

/// Every tier of the taxonomy with its fixed weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordCategory {
    ComplexityHigh,
    ComplexityMedium,
    ComplexityLow,
    ScopeLarge,
    ScopeMedium,
    ScopeSmall,
    Dependency,
}

impl KeywordCategory {
    pub const ALL: [KeywordCategory; 7] = [
        KeywordCategory::ComplexityHigh,
        KeywordCategory::ComplexityMedium,
        KeywordCategory::ComplexityLow,
        KeywordCategory::ScopeLarge,
        KeywordCategory::ScopeMedium,
        KeywordCategory::ScopeSmall,
        KeywordCategory::Dependency,
    ];

    /// Points contributed by each matching keyword of this tier.
    pub fn weight(self) -> i64 {
        match self {
            KeywordCategory::ComplexityHigh | KeywordCategory::ScopeLarge => 2,
            KeywordCategory::ComplexityMedium
            | KeywordCategory::ScopeMedium
            | KeywordCategory::Dependency => 1,
            KeywordCategory::ComplexityLow | KeywordCategory::ScopeSmall => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KeywordCategory::ComplexityHigh => "complexity.high",
            KeywordCategory::ComplexityMedium => "complexity.medium",
            KeywordCategory::ComplexityLow => "complexity.low",
            KeywordCategory::ScopeLarge => "scope.large",
            KeywordCategory::ScopeMedium => "scope.medium",
            KeywordCategory::ScopeSmall => "scope.small",
            KeywordCategory::Dependency => "dependency",
        }
    }

    pub fn weight_label(self) -> String {
        match self.weight() {
            1 => "+1 point each".to_string(),
            -1 => "-1 point each".to_string(),
            w if w > 0 => format!("+{} points each", w),
            w => format!("{} points each", w),
        }
    }

    pub fn parse(name: &str) -> Result<Self, TaxonomyError> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == name)
            .ok_or_else(|| TaxonomyError::UnknownCategory(name.to_string()))
    }
}

impl fmt::Display for KeywordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorized keyword lists consumed by the estimator and feature extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordTaxonomy {
    pub complexity: ComplexityKeywords,
    pub scope: ScopeKeywords,
    pub dependency: KeywordSet,
}

impl KeywordTaxonomy {
    pub fn keywords(&self, category: KeywordCategory) -> &KeywordSet {
        match category {
            KeywordCategory::ComplexityHigh => &self.complexity.high,
            KeywordCategory::ComplexityMedium => &self.complexity.medium,
            KeywordCategory::ComplexityLow => &self.complexity.low,
            KeywordCategory::ScopeLarge => &self.scope.large,
            KeywordCategory::ScopeMedium => &self.scope.medium,
            KeywordCategory::ScopeSmall => &self.scope.small,
            KeywordCategory::Dependency => &self.dependency,
        }
    }

    fn keywords_mut(&mut self, category: KeywordCategory) -> &mut KeywordSet {
        match category {
            KeywordCategory::ComplexityHigh => &mut self.complexity.high,
            KeywordCategory::ComplexityMedium => &mut self.complexity.medium,
            KeywordCategory::ComplexityLow => &mut self.complexity.low,
            KeywordCategory::ScopeLarge => &mut self.scope.large,
            KeywordCategory::ScopeMedium => &mut self.scope.medium,
            KeywordCategory::ScopeSmall => &mut self.scope.small,
            KeywordCategory::Dependency => &mut self.dependency,
        }
    }

    /// Add a keyword; returns `false` when it was already present.
    pub fn add_keyword(
        &mut self,
        category: KeywordCategory,
        keyword: &str,
    ) -> Result<bool, TaxonomyError> {
        self.keywords_mut(category).insert(keyword)
    }

    /// Remove a keyword; returns `false` when it was not present.
    pub fn remove_keyword(&mut self, category: KeywordCategory, keyword: &str) -> bool {
        self.keywords_mut(category).remove(keyword)
    }

    pub fn keyword_count(&self) -> usize {
        KeywordCategory::ALL
            .iter()
            .map(|&category| self.keywords(category).len())
            .sum()
    }

    /// Load a taxonomy from a JSON file.
    pub async fn load_from(path: impl AsRef<Path>) -> Result<Self, TaxonomyError> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Persist the taxonomy as pretty JSON. The file is replaced by rename,
    /// so a concurrent reader sees either the old or the new taxonomy.
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<(), TaxonomyError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

impl Default for KeywordTaxonomy {
    fn default() -> Self {
        Self {
            complexity: ComplexityKeywords {
                high: builtin(DEFAULT_COMPLEXITY_HIGH),
                medium: builtin(DEFAULT_COMPLEXITY_MEDIUM),
                low: builtin(DEFAULT_COMPLEXITY_LOW),
            },
            scope: ScopeKeywords {
                large: builtin(DEFAULT_SCOPE_LARGE),
                medium: builtin(DEFAULT_SCOPE_MEDIUM),
                small: builtin(DEFAULT_SCOPE_SMALL),
            },
            dependency: builtin(DEFAULT_DEPENDENCY),
        }
    }
}

// Built-in lists are lowercase, trimmed and non-empty.
fn builtin(keywords: &[&str]) -> KeywordSet {
    KeywordSet(keywords.iter().map(|k| k.to_string()).collect())
}

const DEFAULT_COMPLEXITY_HIGH: &[&str] = &[
    "complexo",
    "complexa",
    "difícil",
    "desafiador",
    "desafiadora",
    "integração",
    "integrações",
    "múltiplos",
    "múltiplas",
    "vários",
    "várias",
    "algoritmo",
    "algoritmos",
    "otimização",
    "performance",
    "segurança",
    "arquitetura",
    "refatoração",
    "completa",
    "completo",
    "redesenho",
];

const DEFAULT_COMPLEXITY_MEDIUM: &[&str] = &[
    "moderado",
    "moderada",
    "médio",
    "média",
    "implementar",
    "implementação",
    "criar",
    "desenvolver",
    "atualizar",
    "melhorar",
    "modificar",
    "adicionar",
    "funcionalidade",
    "feature",
    "componente",
    "módulo",
    "api",
];

const DEFAULT_COMPLEXITY_LOW: &[&str] = &[
    "simples",
    "fácil",
    "básico",
    "básica",
    "pequeno",
    "pequena",
    "mínimo",
    "mínima",
    "corrigir",
    "ajustar",
    "atualizar",
    "texto",
    "label",
    "estilo",
    "css",
    "documentação",
    "comentário",
    "comentários",
    "typo",
    "erro de digitação",
];

const DEFAULT_SCOPE_LARGE: &[&str] = &[
    "sistema",
    "plataforma",
    "aplicação",
    "aplicativo",
    "completo",
    "completa",
    "todos",
    "todas",
    "inteiro",
    "inteira",
    "global",
    "abrangente",
];

const DEFAULT_SCOPE_MEDIUM: &[&str] = &[
    "módulo",
    "componente",
    "página",
    "tela",
    "feature",
    "funcionalidade",
    "serviço",
    "api",
    "endpoint",
    "fluxo",
    "processo",
];

const DEFAULT_SCOPE_SMALL: &[&str] = &[
    "botão",
    "campo",
    "texto",
    "label",
    "ícone",
    "imagem",
    "estilo",
    "validação",
    "mensagem",
    "notificação",
    "alerta",
    "tooltip",
];

const DEFAULT_DEPENDENCY: &[&str] = &[
    "depende",
    "dependência",
    "dependências",
    "requer",
    "necessita",
    "após",
    "depois",
    "antes",
    "integrar",
    "integração",
    "conectar",
    "terceiros",
    "externo",
    "externa",
    "api",
    "serviço",
    "banco de dados",
];
