//! Static GLP-1 treatment knowledge, scored by keyword overlap.

use super::Language;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KnowledgeItem {
    pub id: &'static str,
    pub title: &'static str,
    pub category: &'static str,
    pub content: &'static str,
}

impl KnowledgeItem {
    const fn new(
        id: &'static str,
        title: &'static str,
        category: &'static str,
        content: &'static str,
    ) -> Self {
        Self {
            id,
            title,
            category,
            content,
        }
    }

    pub fn is_emergency(&self) -> bool {
        self.category == "emergency" || self.category == "emergencia"
    }

    fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.content).to_lowercase()
    }
}

const KNOWLEDGE_ES: &[KnowledgeItem] = &[
    KnowledgeItem::new(
        "glp1_basics_es",
        "¿Qué es Ozempic (Semaglutide)?",
        "medicamento",
        "Ozempic (semaglutide) es un medicamento GLP-1 que ayuda a controlar la diabetes tipo 2 \
         y facilita la pérdida de peso. Funciona imitando una hormona natural que regula el \
         azúcar en sangre y ralentiza el vaciado gástrico, lo que ayuda a sentirse satisfecho \
         por más tiempo.",
    ),
    KnowledgeItem::new(
        "injection_technique_es",
        "Técnica de inyección de Ozempic",
        "administracion",
        "Inyecte Ozempic subcutáneamente en el muslo, abdomen o brazo superior. Rote los sitios \
         de inyección. Limpie el área con alcohol. Inserte la aguja a 90 grados, inyecte \
         lentamente y mantenga presionado 6 segundos antes de retirar. Use una aguja nueva cada \
         vez.",
    ),
    KnowledgeItem::new(
        "common_side_effects_es",
        "Efectos secundarios comunes",
        "efectos_secundarios",
        "Los efectos secundarios más comunes incluyen náuseas (especialmente las primeras \
         semanas), vómitos, diarrea, estreñimiento, dolor abdominal y fatiga. Estos suelen \
         mejorar después de 4-8 semanas. Coma porciones más pequeñas y evite alimentos grasos \
         para reducir las náuseas.",
    ),
    KnowledgeItem::new(
        "serious_side_effects_es",
        "Efectos secundarios graves - Busque atención médica",
        "emergencia",
        "Busque atención médica inmediata si experimenta: pancreatitis (dolor abdominal \
         severo), síntomas de tiroides (bulto en el cuello), reacciones alérgicas graves, \
         problemas renales, o problemas de vesícula biliar. También si tiene náuseas/vómitos \
         severos que impiden mantener líquidos.",
    ),
    KnowledgeItem::new(
        "weight_loss_expectations_es",
        "Expectativas de pérdida de peso",
        "resultados",
        "La pérdida de peso con Ozempic es gradual. Puede esperar perder 5-15% de su peso \
         corporal durante 6-12 meses. La pérdida de peso más rápida ocurre en los primeros 3-6 \
         meses. Una pérdida de 0.5-1 kg por semana es normal y saludable.",
    ),
    KnowledgeItem::new(
        "diet_recommendations_es",
        "Recomendaciones dietéticas con Ozempic",
        "nutricion",
        "Coma porciones más pequeñas y mastique lentamente. Enfóquese en proteínas magras, \
         vegetales y carbohidratos complejos. Evite alimentos muy grasos, picantes o dulces que \
         pueden empeorar las náuseas. Manténgase hidratado bebiendo agua regularmente.",
    ),
    KnowledgeItem::new(
        "missed_dose_es",
        "¿Qué hacer si olvida una dosis?",
        "administracion",
        "Si olvida una dosis y han pasado menos de 5 días, inyéctese tan pronto como recuerde. \
         Si han pasado más de 5 días, omita la dosis olvidada y continúe con su horario \
         regular. Nunca se inyecte dos dosis al mismo tiempo.",
    ),
    KnowledgeItem::new(
        "exercise_recommendations_es",
        "Ejercicio durante el tratamiento",
        "ejercicio",
        "El ejercicio regular mejora los resultados del tratamiento. Comience gradualmente con \
         caminatas de 15-30 minutos. Incluya ejercicios de resistencia 2-3 veces por semana \
         para mantener masa muscular durante la pérdida de peso. Consulte con su médico antes \
         de comenzar un programa de ejercicios intenso.",
    ),
];

const KNOWLEDGE_EN: &[KnowledgeItem] = &[
    KnowledgeItem::new(
        "glp1_basics_en",
        "What is Ozempic (Semaglutide)?",
        "medication",
        "Ozempic (semaglutide) is a GLP-1 medication that helps control type 2 diabetes and \
         facilitates weight loss. It works by mimicking a natural hormone that regulates blood \
         sugar and slows gastric emptying, helping you feel satisfied longer.",
    ),
    KnowledgeItem::new(
        "injection_technique_en",
        "Ozempic injection technique",
        "administration",
        "Inject Ozempic subcutaneously in thigh, abdomen, or upper arm. Rotate injection sites. \
         Clean area with alcohol. Insert needle at 90 degrees, inject slowly and hold for 6 \
         seconds before removing. Use a new needle each time.",
    ),
    KnowledgeItem::new(
        "common_side_effects_en",
        "Common side effects",
        "side_effects",
        "Most common side effects include nausea (especially first weeks), vomiting, diarrhea, \
         constipation, abdominal pain, and fatigue. These usually improve after 4-8 weeks. Eat \
         smaller portions and avoid fatty foods to reduce nausea.",
    ),
    KnowledgeItem::new(
        "serious_side_effects_en",
        "Serious side effects - Seek medical attention",
        "emergency",
        "Seek immediate medical attention if you experience: pancreatitis (severe abdominal \
         pain), thyroid symptoms (neck lump), severe allergic reactions, kidney problems, or \
         gallbladder issues. Also if you have severe nausea/vomiting preventing fluid \
         retention.",
    ),
    KnowledgeItem::new(
        "weight_loss_expectations_en",
        "Weight loss expectations",
        "results",
        "Weight loss with Ozempic is gradual. You can expect to lose 5-15% of your body weight \
         over 6-12 months. Fastest weight loss occurs in the first 3-6 months. A loss of 0.5-1 \
         kg per week is normal and healthy.",
    ),
    KnowledgeItem::new(
        "diet_recommendations_en",
        "Dietary recommendations with Ozempic",
        "nutrition",
        "Eat smaller portions and chew slowly. Focus on lean proteins, vegetables, and complex \
         carbohydrates. Avoid very fatty, spicy, or sweet foods that may worsen nausea. Stay \
         hydrated by drinking water regularly.",
    ),
    KnowledgeItem::new(
        "missed_dose_en",
        "What to do if you miss a dose?",
        "administration",
        "If you miss a dose and less than 5 days have passed, inject as soon as you remember. \
         If more than 5 days have passed, skip the missed dose and continue with your regular \
         schedule. Never inject two doses at the same time.",
    ),
    KnowledgeItem::new(
        "exercise_recommendations_en",
        "Exercise during treatment",
        "exercise",
        "Regular exercise improves treatment outcomes. Start gradually with 15-30 minute walks. \
         Include resistance exercises 2-3 times per week to maintain muscle mass during weight \
         loss. Consult your doctor before starting an intense exercise program.",
    ),
];

// Keyword → query variations. Spanish and English keys share their lists,
// so a variation can score under both.
const KEYWORDS: &[(&str, &[&str])] = &[
    ("náuseas", &["nausea", "náuseas", "vomit", "vómito"]),
    ("inyección", &["inyección", "injection", "inject", "inyectar"]),
    ("dosis", &["dosis", "dose", "missed", "olvida"]),
    ("efectos", &["efectos", "effects", "side", "secundarios"]),
    ("peso", &["peso", "weight", "loss", "pérdida"]),
    ("ozempic", &["ozempic", "semaglutide"]),
    ("ejercicio", &["ejercicio", "exercise", "physical"]),
    ("dieta", &["dieta", "diet", "food", "comida"]),
    ("dolor", &["dolor", "pain", "abdominal"]),
    ("nausea", &["nausea", "náuseas", "vomit", "vómito"]),
    ("injection", &["inyección", "injection", "inject", "inyectar"]),
    ("dose", &["dosis", "dose", "missed", "olvida"]),
    ("effects", &["efectos", "effects", "side", "secundarios"]),
    ("weight", &["peso", "weight", "loss", "pérdida"]),
    ("exercise", &["ejercicio", "exercise", "physical"]),
    ("diet", &["dieta", "diet", "food", "comida"]),
    ("pain", &["dolor", "pain", "abdominal"]),
];

const EMERGENCY_WORDS: &[&str] = &[
    "severe",
    "severo",
    "grave",
    "emergency",
    "emergencia",
    "inmediata",
];

const EMERGENCY_BOOST: u32 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeStats {
    pub spanish_items: usize,
    pub english_items: usize,
    pub categories_es: BTreeSet<&'static str>,
    pub categories_en: BTreeSet<&'static str>,
    pub loaded: bool,
}

/// The bilingual knowledge base.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    es: &'static [KnowledgeItem],
    en: &'static [KnowledgeItem],
}

impl KnowledgeBase {
    pub fn new() -> Self {
        let kb = Self {
            es: KNOWLEDGE_ES,
            en: KNOWLEDGE_EN,
        };
        info!(
            spanish = kb.es.len(),
            english = kb.en.len(),
            "Loaded medical knowledge base"
        );
        kb
    }

    pub fn items(&self, language: Language) -> &'static [KnowledgeItem] {
        match language {
            Language::Es => self.es,
            Language::En => self.en,
        }
    }

    /// Items matching `query`, best first. Ties keep knowledge-base order.
    pub fn relevant(&self, query: &str, language: Language, max: usize) -> Vec<KnowledgeItem> {
        let query = query.to_lowercase();
        let urgent = EMERGENCY_WORDS.iter().any(|w| query.contains(w));

        let mut scored: Vec<(u32, KnowledgeItem)> = self
            .items(language)
            .iter()
            .filter_map(|item| {
                let mut score = score_item(&query, &item.searchable_text());
                if urgent && item.is_emergency() {
                    score += EMERGENCY_BOOST;
                }
                (score > 0).then_some((score, *item))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(max).map(|(_, item)| item).collect()
    }

    pub fn by_category(&self, category: &str, language: Language) -> Vec<KnowledgeItem> {
        self.items(language)
            .iter()
            .filter(|item| item.category == category)
            .copied()
            .collect()
    }

    pub fn emergency(&self, language: Language) -> Vec<KnowledgeItem> {
        let category = match language {
            Language::Es => "emergencia",
            Language::En => "emergency",
        };
        self.by_category(category, language)
    }

    pub fn is_loaded(&self) -> bool {
        !self.es.is_empty() && !self.en.is_empty()
    }

    pub fn stats(&self) -> KnowledgeStats {
        KnowledgeStats {
            spanish_items: self.es.len(),
            english_items: self.en.len(),
            categories_es: self.es.iter().map(|i| i.category).collect(),
            categories_en: self.en.iter().map(|i| i.category).collect(),
            loaded: self.is_loaded(),
        }
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

fn score_item(query: &str, item_text: &str) -> u32 {
    let mut score = 0;
    for (keyword, variations) in KEYWORDS {
        for variation in variations.iter().filter(|v| query.contains(*v)) {
            if item_text.contains(variation) {
                score += 2;
            } else if item_text.contains(keyword) {
                score += 1;
            }
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[KnowledgeItem]) -> Vec<&'static str> {
        items.iter().map(|i| i.id).collect()
    }

    #[test]
    fn both_languages_are_loaded() {
        let kb = KnowledgeBase::new();
        assert!(kb.is_loaded());
        let stats = kb.stats();
        assert_eq!(stats.spanish_items, 8);
        assert_eq!(stats.english_items, 8);
        assert!(stats.categories_es.contains("emergencia"));
        assert!(stats.categories_en.contains("emergency"));
    }

    #[test]
    fn injection_question_ranks_technique_first() {
        let kb = KnowledgeBase::new();
        let items = kb.relevant("How do I inject Ozempic?", Language::En, 5);
        assert_eq!(items[0].id, "injection_technique_en");
        assert!(items.len() <= 5);
    }

    #[test]
    fn spanish_nausea_question_finds_side_effects() {
        let kb = KnowledgeBase::new();
        let items = kb.relevant("Tengo náuseas", Language::Es, 5);
        let found = ids(&items);
        assert!(found.contains(&"common_side_effects_es"));
        assert!(!found.contains(&"glp1_basics_es"));
    }

    #[test]
    fn emergency_words_boost_emergency_items() {
        let kb = KnowledgeBase::new();
        let items = kb.relevant("severe nausea", Language::En, 5);
        assert_eq!(items[0].id, "serious_side_effects_en");
    }

    #[test]
    fn unrelated_query_matches_nothing() {
        let kb = KnowledgeBase::new();
        assert!(kb.relevant("what time is it", Language::En, 5).is_empty());
    }

    #[test]
    fn result_count_is_capped() {
        let kb = KnowledgeBase::new();
        assert_eq!(kb.relevant("ozempic weight", Language::En, 2).len(), 2);
    }

    #[test]
    fn emergency_items_per_language() {
        let kb = KnowledgeBase::new();
        assert_eq!(ids(&kb.emergency(Language::Es)), ["serious_side_effects_es"]);
        assert_eq!(ids(&kb.emergency(Language::En)), ["serious_side_effects_en"]);
        assert_eq!(kb.by_category("administration", Language::En).len(), 2);
    }
}
