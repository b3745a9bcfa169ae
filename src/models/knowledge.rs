use lazy_static::lazy_static;
use std::collections::HashMap;

/// Reference data for one medicine name or brand alias
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MedicineInfo {
    pub generic: &'static str,
    pub category: &'static str,
    pub available: bool,
}

const fn med(generic: &'static str, category: &'static str, available: bool) -> MedicineInfo {
    MedicineInfo { generic, category, available }
}

// Keys are lowercase. Order matters: database matching walks this table
// top to bottom, so results are reproducible run to run.
const ENTRIES: &[(&str, MedicineInfo)] = &[
    // Antibiotics
    ("amoxicillin", med("amoxicillin", "antibiotic", true)),
    ("azithromycin", med("azithromycin", "antibiotic", true)),
    ("ciprofloxacin", med("ciprofloxacin", "antibiotic", true)),
    ("doxycycline", med("doxycycline", "antibiotic", true)),
    ("cephalexin", med("cephalexin", "antibiotic", true)),
    ("augmentin", med("amoxicillin + clavulanic acid", "antibiotic", true)),
    ("metronidazole", med("metronidazole", "antibiotic", true)),
    ("levofloxacin", med("levofloxacin", "antibiotic", true)),
    ("cefixime", med("cefixime", "antibiotic", true)),
    // Pain relievers
    ("ibuprofen", med("ibuprofen", "pain_reliever", true)),
    ("acetaminophen", med("acetaminophen", "pain_reliever", true)),
    ("paracetamol", med("acetaminophen", "pain_reliever", true)),
    ("aspirin", med("aspirin", "pain_reliever", true)),
    ("naproxen", med("naproxen", "pain_reliever", true)),
    ("diclofenac", med("diclofenac", "pain_reliever", true)),
    ("tramadol", med("tramadol", "pain_reliever", true)),
    // Diabetes
    ("metformin", med("metformin", "antidiabetic", true)),
    ("insulin", med("insulin", "antidiabetic", true)),
    ("glipizide", med("glipizide", "antidiabetic", true)),
    ("glimepiride", med("glimepiride", "antidiabetic", true)),
    ("sitagliptin", med("sitagliptin", "antidiabetic", true)),
    // Blood pressure and heart
    ("lisinopril", med("lisinopril", "ace_inhibitor", true)),
    ("enalapril", med("enalapril", "ace_inhibitor", true)),
    ("amlodipine", med("amlodipine", "calcium_channel_blocker", true)),
    ("losartan", med("losartan", "arb", true)),
    ("telmisartan", med("telmisartan", "arb", true)),
    ("atenolol", med("atenolol", "beta_blocker", true)),
    ("metoprolol", med("metoprolol", "beta_blocker", true)),
    ("atorvastatin", med("atorvastatin", "statin", true)),
    ("rosuvastatin", med("rosuvastatin", "statin", true)),
    ("clopidogrel", med("clopidogrel", "antiplatelet", true)),
    // Stomach
    ("omeprazole", med("omeprazole", "ppi", true)),
    ("pantoprazole", med("pantoprazole", "ppi", true)),
    ("rabeprazole", med("rabeprazole", "ppi", true)),
    ("ranitidine", med("ranitidine", "h2_blocker", false)),
    ("famotidine", med("famotidine", "h2_blocker", true)),
    ("domperidone", med("domperidone", "antiemetic", true)),
    ("ondansetron", med("ondansetron", "antiemetic", true)),
    // Allergy and respiratory
    ("cetirizine", med("cetirizine", "antihistamine", true)),
    ("loratadine", med("loratadine", "antihistamine", true)),
    ("montelukast", med("montelukast", "leukotriene_antagonist", true)),
    ("salbutamol", med("salbutamol", "bronchodilator", true)),
    ("prednisolone", med("prednisolone", "corticosteroid", true)),
    // Mental health and neuro
    ("sertraline", med("sertraline", "antidepressant", true)),
    ("fluoxetine", med("fluoxetine", "antidepressant", true)),
    ("alprazolam", med("alprazolam", "anxiolytic", true)),
    ("gabapentin", med("gabapentin", "anticonvulsant", true)),
    // Thyroid
    ("levothyroxine", med("levothyroxine", "thyroid_hormone", true)),
    // Vitamins and supplements
    ("vitamin d", med("cholecalciferol", "vitamin", true)),
    ("vitamin b12", med("cyanocobalamin", "vitamin", true)),
    ("vitamin c", med("ascorbic acid", "vitamin", true)),
    ("folic acid", med("folic acid", "vitamin", true)),
    ("iron", med("ferrous sulfate", "mineral", true)),
    ("calcium", med("calcium carbonate", "mineral", true)),
    ("zinc", med("zinc sulfate", "mineral", true)),
    // Common brand names
    ("crocin", med("acetaminophen", "pain_reliever", true)),
    ("dolo", med("acetaminophen", "pain_reliever", true)),
    ("calpol", med("acetaminophen", "pain_reliever", true)),
    ("combiflam", med("ibuprofen + acetaminophen", "pain_reliever", true)),
    ("disprin", med("aspirin", "pain_reliever", true)),
    ("allegra", med("fexofenadine", "antihistamine", true)),
    ("glycomet", med("metformin", "antidiabetic", true)),
];

lazy_static! {
    static ref INDEX: HashMap<&'static str, MedicineInfo> = ENTRIES.iter().copied().collect();
}

/// Read-only medicine reference table, shared by every analysis.
pub struct KnowledgeBase;

impl KnowledgeBase {
    /// Exact lookup on a lowercase key.
    pub fn lookup(key: &str) -> Option<&'static MedicineInfo> {
        INDEX.get(key.to_lowercase().trim())
    }

    /// Keys in table order.
    pub fn keys() -> impl Iterator<Item = &'static str> {
        ENTRIES.iter().map(|(key, _)| *key)
    }

    pub fn len() -> usize {
        ENTRIES.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let info = KnowledgeBase::lookup("Paracetamol").unwrap();
        assert_eq!(info.generic, "acetaminophen");
        assert_eq!(info.category, "pain_reliever");
        assert!(KnowledgeBase::lookup("xyzmedicine").is_none());
    }

    #[test]
    fn test_keys_are_unique_and_lowercase() {
        assert_eq!(INDEX.len(), KnowledgeBase::len());
        assert!(KnowledgeBase::keys().all(|k| k == k.to_lowercase()));
        assert!(KnowledgeBase::len() >= 50);
    }

    #[test]
    fn test_compound_generic() {
        let info = KnowledgeBase::lookup("combiflam").unwrap();
        assert!(info.generic.contains('+'));
        assert!(!KnowledgeBase::lookup("ranitidine").unwrap().available);
    }
}
