//! Texte C fixe : en-têtes, types de base, trace d'appel, paniques et
//! allocatrice par défaut.

use core::fmt::Write as _;

/// En-têtes toujours inclus, avant les `#inclus` du programme.
pub const INCLUSIONS: &str = "\
#include <stdint.h>
#include <stdio.h>
#include <stdlib.h>
#include <string.h>
#include <pthread.h>
#include \"r16.h\"
";

/// Types et fonctions du support d'exécution.
pub const PREAMBULE: &str = r#"
#if !defined(__bool_true_false_are_defined) && (!defined(__STDC_VERSION__) || __STDC_VERSION__ < 202311L)
typedef unsigned char bool;
#endif
typedef unsigned char octet;

typedef struct chaine { char *pointeur; int64_t taille; } chaine;
typedef struct KsInfoType { uint32_t id; uint32_t taille_en_octet; chaine nom; } KsInfoType;
typedef struct eini { void *pointeur; KsInfoType *info; } eini;

typedef struct PositionCodeSource {
    const char *fichier;
    const char *fonction;
    int ligne;
    int colonne;
} PositionCodeSource;

typedef struct TraceAppel {
    struct TraceAppel *precedente;
    PositionCodeSource position;
    const char *texte;
} TraceAppel;

/* mode : 0 loge, 1 reloge, 2 déloge */
typedef void *(*KR__type_allocatrice)(int mode, int64_t nouvelle_taille, int64_t ancienne_taille,
                                      void *ancien_pointeur, void *donnees, KsInfoType *info,
                                      PositionCodeSource *position);

typedef struct ContexteProgramme {
    KR__type_allocatrice allocatrice;
    void *donnees_allocatrice;
    TraceAppel *trace_appel;
    octet *stockage_temporaire;
    int64_t occupation;
    int64_t capacite;
} ContexteProgramme;

static ContexteProgramme *KR__contexte_global = NULL;

#define DEBUTE_RECORD_TRACE_APPEL(ID, LIGNE, COLONNE, TEXTE) \
    TraceAppel KR__trace##ID = { contexte->trace_appel, { KR__fichier, KR__fonction, LIGNE, COLONNE }, TEXTE }; \
    contexte->trace_appel = &KR__trace##ID
#define TERMINE_RECORD_TRACE_APPEL(ID) contexte->trace_appel = KR__trace##ID.precedente

static void KR__imprime_trace(ContexteProgramme *contexte)
{
    if (contexte == NULL || contexte->trace_appel == NULL) {
        return;
    }
    fprintf(stderr, "Trace d'appel :\n");
    for (TraceAppel *t = contexte->trace_appel; t != NULL; t = t->precedente) {
        fprintf(stderr, "  %s:%d:%d : dans %s\n    %s\n", t->position.fichier, t->position.ligne,
                t->position.colonne, t->position.fonction, t->texte);
    }
}

static void decl_panique(ContexteProgramme *contexte, const char *fichier, int ligne, int colonne, const char *message)
{
    fprintf(stderr, "%s:%d:%d : panique : %s\n", fichier, ligne, colonne, message);
    KR__imprime_trace(contexte);
    exit(1);
}

static void decl_panique_tableau(ContexteProgramme *contexte, const char *fichier, int ligne, int colonne)
{
    decl_panique(contexte, fichier, ligne, colonne, "index hors des limites");
}

static void decl_panique_membre_union(ContexteProgramme *contexte, const char *fichier, int ligne, int colonne)
{
    decl_panique(contexte, fichier, ligne, colonne, "accès à un membre inactif d'une union");
}

static void decl_panique_memoire(ContexteProgramme *contexte, const char *fichier, int ligne, int colonne)
{
    decl_panique(contexte, fichier, ligne, colonne, "impossible d'allouer de la mémoire");
}

static void decl_panique_erreur(ContexteProgramme *contexte, const char *fichier, int ligne, int colonne)
{
    decl_panique(contexte, fichier, ligne, colonne, "valeur non gérée");
}

static void KR__hors_memoire(void)
{
    fprintf(stderr, "panique : mémoire épuisée au démarrage\n");
    exit(1);
}

static void *KR__allocatrice_defaut(int mode, int64_t nouvelle_taille, int64_t ancienne_taille,
                                    void *ancien_pointeur, void *donnees, KsInfoType *info,
                                    PositionCodeSource *position)
{
    (void)ancienne_taille;
    (void)donnees;
    (void)info;
    (void)position;
    switch (mode) {
        case 0: return malloc((size_t)nouvelle_taille);
        case 1: return realloc(ancien_pointeur, (size_t)nouvelle_taille);
        case 2: free(ancien_pointeur); return NULL;
    }
    return NULL;
}

static bool KR__chaines_egales(chaine a, chaine b)
{
    return a.taille == b.taille && (a.taille == 0 || memcmp(a.pointeur, b.pointeur, (size_t)a.taille) == 0);
}
"#;

/// Contenu de `r16.h` : le type `r16` et ses conversions.
pub const R16_H: &str = r#"#ifndef KURI_R16_H
#define KURI_R16_H

#include <stdint.h>
#include <string.h>

typedef uint16_t r16;

static inline float DLS_vers_r32(r16 h)
{
    uint32_t signe = (uint32_t)(h & 0x8000u) << 16;
    uint32_t exposant = (h >> 10) & 0x1fu;
    uint32_t mantisse = h & 0x3ffu;
    uint32_t bits;
    if (exposant == 0) {
        if (mantisse == 0) {
            bits = signe;
        }
        else {
            exposant = 127 - 15 + 1;
            while ((mantisse & 0x400u) == 0) {
                mantisse <<= 1;
                exposant--;
            }
            mantisse &= 0x3ffu;
            bits = signe | (exposant << 23) | (mantisse << 13);
        }
    }
    else if (exposant == 0x1f) {
        bits = signe | 0x7f800000u | (mantisse << 13);
    }
    else {
        bits = signe | ((exposant + 127 - 15) << 23) | (mantisse << 13);
    }
    float f;
    memcpy(&f, &bits, sizeof f);
    return f;
}

static inline double DLS_vers_r64(r16 h)
{
    return (double)DLS_vers_r32(h);
}

static inline r16 DLS_depuis_r32(float f)
{
    uint32_t bits;
    memcpy(&bits, &f, sizeof bits);
    uint16_t signe = (uint16_t)((bits >> 16) & 0x8000u);
    uint32_t brut = (bits >> 23) & 0xffu;
    int32_t exposant = (int32_t)brut - 127 + 15;
    uint32_t mantisse = bits & 0x7fffffu;
    if (brut == 0xffu) {
        return (r16)(signe | 0x7c00u | (mantisse ? 0x200u : 0u));
    }
    if (exposant >= 0x1f) {
        return (r16)(signe | 0x7c00u);
    }
    if (exposant <= 0) {
        if (exposant < -10) {
            return signe;
        }
        mantisse |= 0x800000u;
        uint32_t decalage = (uint32_t)(14 - exposant);
        uint32_t demi = mantisse >> decalage;
        if ((mantisse >> (decalage - 1)) & 1u) {
            demi += 1;
        }
        return (r16)(signe | demi);
    }
    uint16_t resultat = (uint16_t)(signe | ((uint32_t)exposant << 10) | (mantisse >> 13));
    if (mantisse & 0x1000u) {
        resultat += 1;
    }
    return resultat;
}

static inline r16 DLS_depuis_r64(double d)
{
    return DLS_depuis_r32((float)d);
}

#endif
"#;

/// Littéral C pour un texte UTF-8 ; les octets non imprimables sont échappés
/// en octal.
pub fn litteral_c(texte: &str) -> String {
    let mut s = String::with_capacity(texte.len() + 2);
    s.push('"');
    for &o in texte.as_bytes() {
        match o {
            b'"' => s.push_str("\\\""),
            b'\\' => s.push_str("\\\\"),
            b'\n' => s.push_str("\\n"),
            b'\t' => s.push_str("\\t"),
            // `?` évite les trigraphes
            b' '..=b'~' if o != b'?' => s.push(char::from(o)),
            _ => {
                let _ = write!(s, "\\{o:03o}");
            }
        }
    }
    s.push('"');
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn echappements() {
        assert_eq!(litteral_c("a\"b\\c"), r#""a\"b\\c""#);
        assert_eq!(litteral_c("x\n\t"), r#""x\n\t""#);
        assert_eq!(litteral_c("é"), r#""\303\251""#);
        assert_eq!(litteral_c("??="), r#""\077\077=""#);
        assert_eq!(litteral_c("\0"), r#""\000""#);
    }

    #[test]
    fn preambule_complet() {
        for nom in [
            "decl_panique_tableau",
            "decl_panique_membre_union",
            "decl_panique_memoire",
            "decl_panique_erreur",
            "KR__hors_memoire",
            "DEBUTE_RECORD_TRACE_APPEL",
            "TERMINE_RECORD_TRACE_APPEL",
            "KR__allocatrice_defaut",
        ] {
            assert!(PREAMBULE.contains(nom), "{nom} absent du préambule");
        }
        assert!(INCLUSIONS.contains("r16.h"));
        assert!(R16_H.contains("DLS_depuis_r64"));
    }
}
