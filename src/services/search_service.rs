//! Pesquisa e filtros da frota
//!
//! Texto livre sem acentos nem maiúsculas sobre modelo, série, estado, origem
//! e categoria. As frases conhecidas ("rodas brancas", "mastro triplo",
//! "sem joystick"...) viram predicados sobre `caracteristicas` e saem do
//! texto antes da comparação.

use lazy_static::lazy_static;
use serde::Deserialize;

use crate::models::machine::{Caracteristicas, Machine, Origem};
use crate::utils::validation::fold_text;

/// Predicado sobre as características técnicas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeaturePredicate {
    /// Radical do valor de `corPneus`
    CorPneus(&'static str),
    /// Radical do valor de `mastro`
    Mastro(&'static str),
    ViasMastro(&'static str),
    Joystick(bool),
    /// Radical contido em `acessorio`
    Acessorio(&'static str),
}

impl FeaturePredicate {
    pub fn matches(&self, caracteristicas: &Caracteristicas) -> bool {
        let folded = |value: &Option<String>| value.as_deref().map(fold_text).unwrap_or_default();
        match self {
            FeaturePredicate::CorPneus(stem) => folded(&caracteristicas.cor_pneus).starts_with(stem),
            FeaturePredicate::Mastro(stem) => folded(&caracteristicas.mastro).contains(stem),
            FeaturePredicate::ViasMastro(vias) => folded(&caracteristicas.vias_mastro).contains(vias),
            FeaturePredicate::Joystick(true) => caracteristicas.joystick == Some(true),
            FeaturePredicate::Joystick(false) => caracteristicas.joystick != Some(true),
            FeaturePredicate::Acessorio(stem) => folded(&caracteristicas.acessorio).contains(stem),
        }
    }
}

lazy_static! {
    /// Frases já sem acentos, da mais longa para a mais curta
    static ref SYNONYMS: Vec<(&'static str, FeaturePredicate)> = {
        let mut table = vec![
            ("rodas brancas", FeaturePredicate::CorPneus("branc")),
            ("rodas brancos", FeaturePredicate::CorPneus("branc")),
            ("pneus brancos", FeaturePredicate::CorPneus("branc")),
            ("pneus brancas", FeaturePredicate::CorPneus("branc")),
            ("rodas pretas", FeaturePredicate::CorPneus("pret")),
            ("pneus pretos", FeaturePredicate::CorPneus("pret")),
            ("mastro triplo", FeaturePredicate::Mastro("tripl")),
            ("mastro triplex", FeaturePredicate::Mastro("tripl")),
            ("triplex", FeaturePredicate::Mastro("tripl")),
            ("mastro duplo", FeaturePredicate::Mastro("dupl")),
            ("mastro duplex", FeaturePredicate::Mastro("dupl")),
            ("duplex", FeaturePredicate::Mastro("dupl")),
            ("mastro simples", FeaturePredicate::Mastro("simpl")),
            ("simplex", FeaturePredicate::Mastro("simpl")),
            ("3 vias", FeaturePredicate::ViasMastro("3")),
            ("4 vias", FeaturePredicate::ViasMastro("4")),
            ("sem joystick", FeaturePredicate::Joystick(false)),
            ("com joystick", FeaturePredicate::Joystick(true)),
            ("joystick", FeaturePredicate::Joystick(true)),
            ("deslocador lateral", FeaturePredicate::Acessorio("desloc")),
            ("sideshift", FeaturePredicate::Acessorio("sideshift")),
            ("posicionador", FeaturePredicate::Acessorio("posicionador")),
            ("pinca", FeaturePredicate::Acessorio("pinca")),
        ];
        table.sort_by_key(|(phrase, _)| std::cmp::Reverse(phrase.len()));
        table
    };
}

/// Consulta já interpretada
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub terms: Vec<String>,
    pub predicates: Vec<FeaturePredicate>,
}

impl SearchQuery {
    pub fn parse(raw: &str) -> Self {
        let mut remaining = format!(" {} ", fold_text(raw).split_whitespace().collect::<Vec<_>>().join(" "));
        let mut predicates = Vec::new();

        for (phrase, predicate) in SYNONYMS.iter() {
            let needle = format!(" {} ", phrase);
            if remaining.contains(&needle) {
                remaining = remaining.replace(&needle, " ");
                if !predicates.contains(predicate) {
                    predicates.push(*predicate);
                }
            }
        }

        Self {
            terms: remaining.split_whitespace().map(str::to_string).collect(),
            predicates,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.predicates.is_empty()
    }

    /// Cada termo tem de aparecer num dos campos e cada predicado tem de valer
    pub fn matches(&self, machine: &Machine) -> bool {
        if !self.predicates.iter().all(|p| p.matches(&machine.caracteristicas)) {
            return false;
        }
        if self.terms.is_empty() {
            return true;
        }
        let haystack = [
            fold_text(&machine.modelo),
            fold_text(&machine.serie),
            fold_text(&machine.estado.to_string()),
            machine.origem.as_str().to_string(),
            machine.categoria.as_deref().map(fold_text).unwrap_or_default(),
        ];
        self.terms
            .iter()
            .all(|term| haystack.iter().any(|field| field.contains(term.as_str())))
    }
}

/// Filtros estruturados da listagem
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineFilters {
    pub q: Option<String>,
    pub origem: Option<Origem>,
    /// Prefixo do estado (`em-preparacao`, `concluida`...)
    pub estado: Option<String>,
    pub tecnico: Option<String>,
    pub prioridade: Option<bool>,
    pub aguarda_pecas: Option<bool>,
    pub reservada: Option<bool>,
}

impl MachineFilters {
    pub fn apply(&self, machines: Vec<Machine>) -> Vec<Machine> {
        let query = self.q.as_deref().map(SearchQuery::parse).unwrap_or_default();
        machines
            .into_iter()
            .filter(|m| self.matches_fields(m) && query.matches(m))
            .collect()
    }

    fn matches_fields(&self, machine: &Machine) -> bool {
        self.origem.map_or(true, |o| machine.origem == o)
            && self
                .estado
                .as_deref()
                .map_or(true, |prefix| machine.estado.to_string().starts_with(prefix))
            && self.tecnico.as_deref().map_or(true, |t| {
                machine.tecnico.as_deref() == Some(t) || machine.estado.technician() == Some(t)
            })
            && self.prioridade.map_or(true, |p| machine.prioridade == p)
            && self.aguarda_pecas.map_or(true, |a| machine.aguarda_pecas == a)
            && self.reservada.map_or(true, |r| machine.reservada() == r)
    }
}

/// Atalho: a máquina corresponde ao texto livre?
pub fn matches(machine: &Machine, query: &str) -> bool {
    SearchQuery::parse(query).matches(machine)
}
