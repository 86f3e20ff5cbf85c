//! Class table and disease knowledge base
//!
//! The class table is positionally aligned with the classifier's output
//! vector: index i of the score vector corresponds to `CLASS_NAMES[i]`.
//! The knowledge base is read-only for the process lifetime and the lookup
//! is total: unknown classes resolve to a placeholder record.

use leafscan_core::{ClassMetadata, DiseaseRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// PlantVillage class names, one per classifier output index
pub const CLASS_NAMES: [&str; 38] = [
    "Apple — Apple Scab",
    "Apple — Black Rot",
    "Apple — Cedar Apple Rust",
    "Apple — Healthy",
    "Blueberry — Healthy",
    "Cherry (including sour) — Powdery Mildew",
    "Cherry (including sour) — Healthy",
    "Corn (maize) — Cercospora Leaf Spot / Gray Leaf Spot",
    "Corn (maize) — Common Rust",
    "Corn (maize) — Northern Leaf Blight",
    "Corn (maize) — Healthy",
    "Grape — Black Rot",
    "Grape — Esca (Black Measles)",
    "Grape — Leaf Blight (Isariopsis Leaf Spot)",
    "Grape — Healthy",
    "Orange — Haunglongbing (Citrus Greening)",
    "Peach — Bacterial Spot",
    "Peach — Healthy",
    "Pepper, bell — Bacterial Spot",
    "Pepper, bell — Healthy",
    "Potato — Early Blight",
    "Potato — Late Blight",
    "Potato — Healthy",
    "Raspberry — Healthy",
    "Soybean — Healthy",
    "Squash — Powdery Mildew",
    "Strawberry — Leaf Scorch",
    "Strawberry — Healthy",
    "Tomato — Bacterial Spot",
    "Tomato — Early Blight",
    "Tomato — Late Blight",
    "Tomato — Leaf Mold",
    "Tomato — Septoria Leaf Spot",
    "Tomato — Spider Mites / Two-spotted Spider Mite",
    "Tomato — Target Spot",
    "Tomato — Tomato Yellow Leaf Curl Virus",
    "Tomato — Tomato Mosaic Virus",
    "Tomato — Healthy",
];

/// (class_name, cause, symptoms, treatment)
const DISEASE_INFO: [(&str, &str, &str, &str); 38] = [
    (
        "Apple — Apple Scab",
        "Fungus Venturia inaequalis",
        "Dark, olive-green to brown lesions on leaves and fruit with velvety texture.",
        "Apply fungicides (captan, myclobutanil) during spring. Remove fallen leaves to reduce overwintering spores. Plant resistant cultivars.",
    ),
    (
        "Apple — Black Rot",
        "Fungus Botryosphaeria obtusa",
        "Circular brown lesions on fruit with concentric rings; leaf spots with purple margins.",
        "Prune dead or infected branches. Remove mummified fruits. Apply fungicides during early season.",
    ),
    (
        "Apple — Cedar Apple Rust",
        "Fungus Gymnosporangium juniperi-virginianae",
        "Bright orange-yellow spots on upper leaf surface with tube-like structures underneath.",
        "Remove nearby juniper/cedar hosts. Apply fungicides at pink bud and petal fall stages.",
    ),
    (
        "Apple — Healthy",
        "N/A",
        "No disease symptoms detected. Plant appears healthy.",
        "Continue regular maintenance: proper watering, pruning, and preventive fungicide applications.",
    ),
    (
        "Blueberry — Healthy",
        "N/A",
        "No disease symptoms detected. Plant appears healthy.",
        "Maintain acidic soil pH (4.5–5.5), mulch with pine bark, and ensure adequate drainage.",
    ),
    (
        "Cherry (including sour) — Powdery Mildew",
        "Fungus Podosphaera clandestina",
        "White powdery coating on leaves, shoots, and sometimes fruit.",
        "Improve air circulation through pruning. Apply sulfur-based or systemic fungicides early in the season.",
    ),
    (
        "Cherry (including sour) — Healthy",
        "N/A",
        "No disease symptoms detected. Plant appears healthy.",
        "Continue proper irrigation, pruning, and dormant-season pest management.",
    ),
    (
        "Corn (maize) — Cercospora Leaf Spot / Gray Leaf Spot",
        "Fungus Cercospora zeae-maydis",
        "Rectangular, gray to tan lesions parallel to leaf veins.",
        "Rotate crops, till residue, and plant resistant hybrids. Apply foliar fungicides if needed.",
    ),
    (
        "Corn (maize) — Common Rust",
        "Fungus Puccinia sorghi",
        "Small, circular to elongated reddish-brown pustules on both leaf surfaces.",
        "Plant resistant hybrids. Apply fungicides if rust appears before tasseling.",
    ),
    (
        "Corn (maize) — Northern Leaf Blight",
        "Fungus Exserohilum turcicum",
        "Long, cigar-shaped gray-green to tan lesions on leaves.",
        "Use resistant hybrids and crop rotation. Apply fungicides during early infection stages.",
    ),
    (
        "Corn (maize) — Healthy",
        "N/A",
        "No disease symptoms detected. Plant appears healthy.",
        "Maintain proper fertilization, irrigation, and crop rotation schedules.",
    ),
    (
        "Grape — Black Rot",
        "Fungus Guignardia bidwellii",
        "Brown circular leaf spots with dark borders; fruit shrivels into hard black mummies.",
        "Remove mummified berries and infected canes. Apply fungicides from bud break to veraison.",
    ),
    (
        "Grape — Esca (Black Measles)",
        "Complex of fungi including Phaeomoniella chlamydospora",
        "Interveinal striping on leaves; dark spots on berries; wood shows dark streaking.",
        "No proven cure. Prune and destroy infected wood. Apply wound protectants after pruning.",
    ),
    (
        "Grape — Leaf Blight (Isariopsis Leaf Spot)",
        "Fungus Pseudocercospora vitis",
        "Irregular dark brown spots on leaves, often with yellow halos.",
        "Improve canopy air flow. Apply copper-based fungicides. Remove infected leaves.",
    ),
    (
        "Grape — Healthy",
        "N/A",
        "No disease symptoms detected. Plant appears healthy.",
        "Maintain good canopy management, proper pruning, and preventive spray programs.",
    ),
    (
        "Orange — Haunglongbing (Citrus Greening)",
        "Bacterium Candidatus Liberibacter asiaticus, spread by Asian citrus psyllid",
        "Asymmetric blotchy mottling of leaves; lopsided, bitter fruit with aborted seeds.",
        "No cure. Control psyllid vectors with insecticides. Remove infected trees to prevent spread.",
    ),
    (
        "Peach — Bacterial Spot",
        "Bacterium Xanthomonas arboricola pv. pruni",
        "Small, dark, water-soaked spots on leaves that may drop out leaving a 'shot-hole' appearance.",
        "Plant resistant varieties. Apply copper sprays at leaf fall and bactericides during growing season.",
    ),
    (
        "Peach — Healthy",
        "N/A",
        "No disease symptoms detected. Plant appears healthy.",
        "Continue proper pruning, thinning, and dormant-season copper applications.",
    ),
    (
        "Pepper, bell — Bacterial Spot",
        "Bacterium Xanthomonas campestris pv. vesicatoria",
        "Small, water-soaked spots on leaves and fruit that become brown and scabby.",
        "Use disease-free seeds and transplants. Apply copper sprays. Avoid overhead irrigation.",
    ),
    (
        "Pepper, bell — Healthy",
        "N/A",
        "No disease symptoms detected. Plant appears healthy.",
        "Maintain proper spacing, water at the base, and rotate crops yearly.",
    ),
    (
        "Potato — Early Blight",
        "Fungus Alternaria solani",
        "Dark brown spots with concentric rings (target pattern) on older leaves first.",
        "Rotate crops 2–3 years. Apply fungicides preventively. Destroy crop debris after harvest.",
    ),
    (
        "Potato — Late Blight",
        "Oomycete Phytophthora infestans",
        "Large, water-soaked, dark green to brown lesions on leaves; white mold on leaf undersides.",
        "Apply protective fungicides before symptoms appear. Destroy infected plants immediately. Plant certified seed.",
    ),
    (
        "Potato — Healthy",
        "N/A",
        "No disease symptoms detected. Plant appears healthy.",
        "Keep hilling soil around plants; maintain proper irrigation and nutrient management.",
    ),
    (
        "Raspberry — Healthy",
        "N/A",
        "No disease symptoms detected. Plant appears healthy.",
        "Prune spent canes, maintain good air circulation, and apply dormant sprays.",
    ),
    (
        "Soybean — Healthy",
        "N/A",
        "No disease symptoms detected. Plant appears healthy.",
        "Continue crop rotation, proper seed treatment, and integrated pest management.",
    ),
    (
        "Squash — Powdery Mildew",
        "Fungi Podosphaera xanthii or Erysiphe cichoracearum",
        "White powdery spots on leaves expanding to cover the entire surface.",
        "Plant resistant varieties. Apply fungicides (neem oil, potassium bicarbonate, sulfur) at first sign.",
    ),
    (
        "Strawberry — Leaf Scorch",
        "Fungus Diplocarpon earlianum",
        "Irregular dark purple to brown spots on leaves; severe cases cause leaf margins to curl and dry.",
        "Remove infected leaves. Improve air circulation. Apply fungicides during bloom period.",
    ),
    (
        "Strawberry — Healthy",
        "N/A",
        "No disease symptoms detected. Plant appears healthy.",
        "Renovate beds annually, remove runners as needed, and maintain proper mulching.",
    ),
    (
        "Tomato — Bacterial Spot",
        "Bacterium Xanthomonas spp.",
        "Small, water-soaked, dark spots on leaves, stems, and fruit; leaf spots may have yellow halos.",
        "Use disease-free seeds. Apply copper-based bactericides. Avoid working with wet plants.",
    ),
    (
        "Tomato — Early Blight",
        "Fungus Alternaria solani",
        "Dark concentric-ring spots on lower leaves first; stems may show dark, sunken cankers.",
        "Stake plants for air flow. Mulch to prevent soil splash. Apply fungicides preventively.",
    ),
    (
        "Tomato — Late Blight",
        "Oomycete Phytophthora infestans",
        "Large, greasy, gray-green lesions on leaves and stems; white mold in humid conditions.",
        "Remove infected plants immediately. Apply fungicides preventively during cool, wet weather.",
    ),
    (
        "Tomato — Leaf Mold",
        "Fungus Passalora fulva",
        "Pale green to yellow spots on upper leaves; olive-green to brown velvety mold underneath.",
        "Improve greenhouse ventilation. Reduce humidity. Apply fungicides and use resistant varieties.",
    ),
    (
        "Tomato — Septoria Leaf Spot",
        "Fungus Septoria lycopersici",
        "Numerous small, circular spots with dark borders and gray centers on lower leaves.",
        "Remove infected lower leaves. Avoid overhead watering. Apply fungicides at first sign.",
    ),
    (
        "Tomato — Spider Mites / Two-spotted Spider Mite",
        "Arachnid Tetranychus urticae",
        "Tiny yellow spots (stippling) on leaves; fine webbing on leaf undersides; bronzing.",
        "Spray with strong water jets. Release predatory mites. Apply miticides or insecticidal soap.",
    ),
    (
        "Tomato — Target Spot",
        "Fungus Corynespora cassiicola",
        "Brown spots with concentric rings and yellow halos, mainly on lower and middle leaves.",
        "Improve air circulation. Remove lower infected leaves. Apply broad-spectrum fungicides.",
    ),
    (
        "Tomato — Tomato Yellow Leaf Curl Virus",
        "Begomovirus transmitted by whiteflies (Bemisia tabaci)",
        "Severe upward curling, yellowing, and stunting of leaves; reduced fruit set.",
        "Control whitefly populations with insecticides or reflective mulch. Remove infected plants. Use resistant varieties.",
    ),
    (
        "Tomato — Tomato Mosaic Virus",
        "Tobamovirus (ToMV), mechanically transmitted",
        "Mottled light and dark green mosaic pattern on leaves; leaf distortion; stunted growth.",
        "No cure. Remove infected plants. Disinfect tools. Use resistant varieties and certified virus-free seeds.",
    ),
    (
        "Tomato — Healthy",
        "N/A",
        "No disease symptoms detected. Plant appears healthy.",
        "Continue proper staking, watering at the base, and regular inspection for early disease signs.",
    ),
];

fn disease_map() -> &'static BTreeMap<&'static str, DiseaseRecord> {
    static MAP: OnceLock<BTreeMap<&'static str, DiseaseRecord>> = OnceLock::new();
    MAP.get_or_init(|| {
        DISEASE_INFO
            .iter()
            .map(|&(name, cause, symptoms, treatment)| {
                (
                    name,
                    DiseaseRecord {
                        cause: cause.to_string(),
                        symptoms: symptoms.to_string(),
                        treatment: treatment.to_string(),
                    },
                )
            })
            .collect()
    })
}

/// Number of classes the classifier must emit scores for
pub fn num_classes() -> usize {
    CLASS_NAMES.len()
}

/// Class name for an output index, if in range
pub fn class_name(index: usize) -> Option<&'static str> {
    CLASS_NAMES.get(index).copied()
}

/// Total knowledge-base lookup: unknown classes get the placeholder record
pub fn disease_record(class_name: &str) -> DiseaseRecord {
    disease_map()
        .get(class_name)
        .cloned()
        .unwrap_or_else(DiseaseRecord::placeholder)
}

/// Static listing served by the classes endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CatalogListing {
    pub total_classes: usize,
    pub plants: Vec<String>,
    pub classes: Vec<ClassMetadata>,
    pub disease_info: BTreeMap<String, DiseaseRecord>,
}

/// Build the full catalog listing: every class with derived metadata, the
/// sorted unique plant list, and the complete knowledge base.
pub fn catalog_listing() -> CatalogListing {
    let classes: Vec<ClassMetadata> = CLASS_NAMES
        .iter()
        .map(|&name| ClassMetadata::from_class_name(name))
        .collect();

    let mut plants: Vec<String> = classes.iter().map(|c| c.plant.clone()).collect();
    plants.sort();
    plants.dedup();

    let disease_info = disease_map()
        .iter()
        .map(|(&name, record)| (name.to_string(), record.clone()))
        .collect();

    CatalogListing {
        total_classes: CLASS_NAMES.len(),
        plants,
        classes,
        disease_info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_class_has_a_disease_record() {
        for name in CLASS_NAMES {
            let record = disease_record(name);
            assert_ne!(record, DiseaseRecord::placeholder(), "missing entry for {name}");
        }
    }

    #[test]
    fn unknown_class_gets_placeholder() {
        let record = disease_record("Cabbage — Imaginary Blight");
        assert_eq!(record, DiseaseRecord::placeholder());
    }

    #[test]
    fn listing_has_sorted_unique_plants() {
        let listing = catalog_listing();
        assert_eq!(listing.total_classes, 38);
        assert_eq!(listing.classes.len(), 38);

        let mut sorted = listing.plants.clone();
        sorted.sort();
        assert_eq!(listing.plants, sorted);
        assert_eq!(listing.plants.iter().filter(|p| *p == "Tomato").count(), 1);
    }

    #[test]
    fn metadata_derivation_matches_expectations() {
        let listing = catalog_listing();
        let late_blight = listing
            .classes
            .iter()
            .find(|c| c.class_name == "Tomato — Late Blight")
            .unwrap();
        assert_eq!(late_blight.plant, "Tomato");
        assert_eq!(late_blight.condition, "Late Blight");
        assert!(!late_blight.is_healthy);

        let healthy = listing
            .classes
            .iter()
            .find(|c| c.class_name == "Tomato — Healthy")
            .unwrap();
        assert!(healthy.is_healthy);
    }
}
