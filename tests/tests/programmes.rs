//! Programmes complets compilés vers C.

use kuri_compiler::OptionsCompilation;
use kuri_tests::{compile, compile_avec, corps, options, position};
use pretty_assertions::assert_eq;

#[test]
fn principale_appelee_par_main() {
    let c = compile("fonc principale() : z32 { retourne 0; }");
    assert!(c.contains("static int32_t _KF5essai_10principale(ContexteProgramme *contexte)"), "{c}");
    let main = &c[position(&c, "int main(void)")..];
    assert!(main.contains("KR__initialise_globales(contexte);"));
    assert!(main.contains("int32_t KR__resultat = _KF5essai_10principale(contexte);"));
    assert!(main.contains("return (int)KR__resultat;"));
}

#[test]
fn point_entree_choisi() {
    let options = OptionsCompilation { point_entree: "demarre".into(), ..options() };
    let c = compile_avec("fonc demarre() : z32 { retourne 3; }", options);
    assert!(c.contains("KR__resultat = _KF5essai_7demarre(contexte);"), "{c}");
}

#[test]
fn sortie_deterministe() {
    let src = "Point :: struct { x : z32; y : z32; }
               fonc norme(p : Point) : z32 { retourne p.x * p.x + p.y * p.y; }
               fonc principale() : z32 { p := Point(x = 3, y = 4); retourne norme(p); }";
    assert_eq!(compile(src), compile(src));
}

#[test]
fn fonction_externe_non_broyee() {
    let src = "externe fonc printf(format : *z8, args : ...) : z32;
               fonc principale() : z32 {
                   printf(\"bonjour\\n\".pointeur);
                   retourne 0;
               }";
    let c = compile(src);
    let principale = corps(&c, "_KF5essai_10principale");
    assert!(principale.contains("printf("), "{principale}");
    assert!(!c.contains("_KF5essai_6printf"), "{c}");
}

#[test]
fn sorties_multiples_par_pointeurs() {
    let src = "fonc divise(a : z32, b : z32) : z32, z32 { retourne a / b, a % b; }
               fonc principale() : z32 {
                   q, r := divise(7, 2);
                   retourne q + r;
               }";
    let c = compile(src);
    assert!(c.contains("static int32_t _KF5essai_6divise(ContexteProgramme *contexte, int32_t a, int32_t b, int32_t *__ret1)"), "{c}");
    assert!(corps(&c, "_KF5essai_6divise").contains("*__ret1 = "));
    assert!(corps(&c, "_KF5essai_10principale").contains("_KF5essai_6divise(contexte, 7, 2, &"));
}

#[test]
fn structures_dans_l_ordre_des_dependances() {
    let src = "Segment :: struct { a : Point; b : Point; }
               Point :: struct { x : r32; y : r32; }
               fonc principale() : z32 { s : Segment; retourne 0; }";
    let c = compile(src);
    assert!(position(&c, "struct KsPoint {") < position(&c, "struct KsSegment {"), "{c}");
    assert_eq!(c.matches("struct KsPoint {").count(), 1);
}

#[test]
fn structure_autoreferente() {
    let src = "Noeud :: struct { suivant : *Noeud; valeur : z32; }
               fonc principale() : z32 { n : Noeud; n.valeur = 2; retourne n.valeur; }";
    let c = compile(src);
    assert_eq!(c.matches("struct KsNoeud {").count(), 1, "{c}");
    assert!(c.contains("KsNoeud * suivant;"), "{c}");
}

#[test]
fn enumeration_et_discrimination() {
    let src = "Couleur :: énum n8 { ROUGE; VERT = 5; BLEU; }
               fonc principale() : z32 {
                   c := Couleur.VERT;
                   discr c {
                       ROUGE, BLEU { retourne 1; }
                       VERT { retourne 2; }
                   }
                   retourne 0;
               }";
    let c = compile(src);
    assert!(c.contains("typedef uint8_t KsCouleur;"), "{c}");
    let principale = corps(&c, "_KF5essai_10principale");
    assert!(principale.contains("__fin_discr"), "{principale}");
}

#[test]
fn union_sure_discriminee() {
    let src = "Forme :: union { cercle : r32; carre : z32; }
               fonc principale() : z32 {
                   f : Forme;
                   f.carre = 4;
                   discr f {
                       cercle { retourne 1; }
                       carre { retourne 2; }
                       sinon { retourne 3; }
                   }
                   retourne 0;
               }";
    let c = compile(src);
    assert!(c.contains("int membre_actif;"), "{c}");
    let principale = corps(&c, "_KF5essai_10principale");
    assert!(principale.contains("membre_actif = 2;"), "{principale}");
    assert!(principale.contains(".membre_actif == 1"), "{principale}");
}

#[test]
fn differe_rejoue_avant_chaque_sortie() {
    let src = "fonc ferme() {}
               fonc principale() : z32 {
                   diffère { ferme(); }
                   boucle {
                       arrête;
                   }
                   si vrai { retourne 1; }
                   retourne 0;
               }";
    let c = compile(src);
    let principale = corps(&c, "_KF5essai_10principale");
    assert_eq!(principale.matches("_KF5essai_5ferme(contexte);").count(), 2, "{principale}");
    assert!(principale.contains("while (1)"));
}

#[test]
fn boucle_pour_sur_tableau_et_chaine() {
    let src = "fonc principale() : z32 {
                   t := [1, 2, 3];
                   total := 0;
                   pour x, i dans t { total += x * i; }
                   pour car dans \"abc\" { total += 1; }
                   retourne total;
               }";
    let c = compile(src);
    let principale = corps(&c, "_KF5essai_10principale");
    assert!(principale.contains("__index"), "{principale}");
    assert!(principale.contains("__continue_boucle_pour"), "{principale}");
}

#[test]
fn coroutine_iteree() {
    let src = "corout compte(n : z32) : z32 {
                   i := 0;
                   tantque i < n { retiens i; i += 1; }
               }
               fonc principale() : z32 {
                   total := 0;
                   pour x dans compte(3) { total += x; }
                   retourne total;
               }";
    let c = compile(src);
    assert!(c.contains("static void *_KF5essai_6compte(void *KR__arg)"), "{c}");
    let principale = corps(&c, "_KF5essai_10principale");
    assert!(principale.contains("pthread_create("), "{principale}");
    assert!(principale.contains("pthread_join("), "{principale}");
}

#[test]
fn memoire_logee_et_delogee() {
    let src = "fonc principale() : z32 {
                   p := loge z32;
                   t := loge [8]r64;
                   s := loge chaine(16);
                   reloge s : chaine(32);
                   déloge s;
                   déloge t;
                   déloge p;
                   retourne 0;
               }";
    let c = compile(src);
    let principale = corps(&c, "_KF5essai_10principale");
    assert!(principale.contains("contexte->allocatrice("), "{principale}");
    assert!(principale.contains("decl_panique_memoire(contexte"), "{principale}");
}

#[test]
fn traces_d_appel_selon_les_options() {
    let src = "fonc un() : z32 { retourne 1; } fonc principale() : z32 { retourne un(); }";
    let avec = compile_avec(src, OptionsCompilation::default());
    let sans = compile(src);
    assert!(avec.contains("static const char *KR__fonction = \"un\";"), "{avec}");
    assert!(!sans.contains("static const char *KR__fonction"), "{sans}");
}

#[test]
fn nulctx_sans_contexte() {
    let src = "#nulctx fonc double(x : z32) : z32 { retourne x + x; }
               fonc principale() : z32 { retourne double(2); }";
    let c = compile(src);
    assert!(c.contains("static int32_t _KF5essai_6double(int32_t x)"), "{c}");
    assert!(corps(&c, "_KF5essai_10principale").contains("_KF5essai_6double(2)"));
}

#[test]
fn noms_unicode_et_ascii_distincts() {
    let src = "fonc é() : z32 { retourne 1; }
               fonc xC3xA9() : z32 { retourne 2; }
               fonc principale() : z32 {
                   à := é();
                   xC3xA0 := xC3xA9();
                   retourne à + xC3xA0;
               }";
    let c = compile(src);
    assert!(c.contains("static int32_t _KF5essai_8_xC3_xA9(ContexteProgramme *contexte)"), "{c}");
    assert!(c.contains("static int32_t _KF5essai_6xC3xA9(ContexteProgramme *contexte)"), "{c}");
    let principale = corps(&c, "_KF5essai_10principale");
    assert!(principale.contains("int32_t _xC3_xA0 = "), "{principale}");
    assert!(principale.contains("int32_t xC3xA0 = "), "{principale}");
}

#[test]
fn enumeration_aux_valeurs_calculees() {
    let src = "Couleur :: énum z32 { ROUGE; VERT = 5; NOIR = VERT * 2; }
               fonc principale() : z32 {
                   c := Couleur.NOIR;
                   retourne 0;
               }";
    let c = compile(src);
    assert!(corps(&c, "_KF5essai_10principale").contains("KsCouleur c = 10;"), "{c}");
}

#[test]
fn reference_derivee_vers_base() {
    let src = "Base :: struct { x : z32; }
               Derive :: struct { y : z64; empl b : Base; }
               fonc lis(b : &Base) : z32 { retourne b.x; }
               fonc principale() : z32 {
                   d : Derive;
                   d.b.x = 7;
                   r : &Derive = d;
                   retourne lis(r);
               }";
    let c = compile(src);
    assert!(c.contains("static int32_t _KF5essai_3lis(ContexteProgramme *contexte, KsBase *b)"), "{c}");
    assert!(corps(&c, "_KF5essai_3lis").contains("b->x"), "{c}");
    let principale = corps(&c, "_KF5essai_10principale");
    assert!(principale.contains("_KF5essai_3lis(contexte, ((KsBase *)((char *)r + 8)))"), "{principale}");
}
