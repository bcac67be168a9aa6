//! Spanish-speaking clinical assistant. Consults the conversation stores and
//! documents; procedural memory is left out.

use super::settings_schema_with;
use crate::pipeline::AgentProfile;
use medchat_core::agent::ChatTurn;
use medchat_core::memory::MemoryType;
use serde_json::json;

const BASE_PROMPT: &str = "Eres un asistente clínico enfocado en proporcionar evaluaciones médicas \
    claras y accionables. Tu rol es:\n\
    1. Analizar síntomas e historial médico\n\
    2. Proporcionar diagnósticos claros o posibles condiciones\n\
    3. Evaluar el nivel de urgencia\n\
    4. Recomendar acciones inmediatas\n\
    5. Sugerir opciones de tratamiento\n\n\
    Siempre prioriza la seguridad del paciente y la comunicación clara. \
    Sé directo y específico en tus recomendaciones.";

const CLINICAL_GUIDELINES: &str = "Guías Clínicas:\n\
    1. Siempre evalúa la urgencia primero\n\
    2. Considera condiciones comunes antes que las raras\n\
    3. Busca señales de alerta y signos de advertencia\n\
    4. Considera el historial médico del paciente\n\
    5. Recomienda el nivel de atención apropiado\n\
    6. Sé claro sobre cuándo buscar atención de emergencia\n\
    7. Proporciona recomendaciones específicas y accionables\n\
    8. Considera posibles complicaciones\n\
    9. Nota cualquier contraindicación\n\
    10. Incluye recomendaciones de seguimiento";

const DISCLAIMER: &str = "IMPORTANTE: Este es un asistente de IA que proporciona orientación \
    general. Para emergencias médicas, llame a los servicios de emergencia inmediatamente. \
    Siempre consulte con profesionales de la salud para decisiones médicas.";

const MEMORY_TYPES: [MemoryType; 3] = [
    MemoryType::ShortTerm,
    MemoryType::Semantic,
    MemoryType::Episodic,
];

pub struct ClinicalAgent;

impl AgentProfile for ClinicalAgent {
    fn id(&self) -> &'static str {
        "clinical"
    }

    fn name(&self) -> &'static str {
        "Asistente Clínico"
    }

    fn description(&self) -> &'static str {
        "Asistente clínico en español que proporciona orientación diagnóstica y recomendaciones \
         de tratamiento basadas en síntomas e historial médico, para la evaluación inicial y los \
         próximos pasos."
    }

    fn settings_schema(&self) -> serde_json::Value {
        settings_schema_with(json!({
            "max_history_items": {
                "type": "integer",
                "description": "Número máximo de elementos del historial a considerar",
                "default": 5,
                "minimum": 1,
                "maximum": 20
            },
            "urgency_threshold": {
                "type": "string",
                "description": "Umbral para determinar la urgencia de una condición",
                "enum": ["bajo", "medio", "alto"],
                "default": "medio"
            },
            "include_treatment_options": {
                "type": "boolean",
                "description": "Incluir opciones de tratamiento en las respuestas",
                "default": true
            },
            "include_follow_up": {
                "type": "boolean",
                "description": "Incluir recomendaciones de seguimiento",
                "default": true
            }
        }))
    }

    fn memory_types(&self) -> &'static [MemoryType] {
        &MEMORY_TYPES
    }

    fn system_prompt(&self, context: Option<&str>, _turn: &ChatTurn) -> String {
        let mut sections = vec![BASE_PROMPT.to_string()];
        if let Some(context) = context {
            sections.push(format!("Contexto Adicional:\n{context}"));
        }
        sections.push(CLINICAL_GUIDELINES.to_string());
        sections.push(DISCLAIMER.to_string());
        sections.join("\n\n")
    }
}
